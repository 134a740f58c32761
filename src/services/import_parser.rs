// src/services/import_parser.rs

use std::{borrow::Cow, collections::HashMap, str::FromStr};

use quick_xml::{
    events::{BytesStart, Event},
    Reader,
};
use rust_decimal::Decimal;

use crate::{
    common::slug::generate_slug,
    models::{
        import::{ImportErrorKind, ImportedListing, OwnerRow, RecordIssue},
        property::{PropertyImage, PropertyType, TransactionType},
    },
};

const OLE_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
const ZIP_MAGIC: [u8; 4] = [b'P', b'K', 0x03, 0x04];
const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Resultado da leitura do feed: anúncios válidos e problemas por registro.
#[derive(Debug, Default)]
pub struct ParsedFeed {
    pub total_records: usize,
    pub listings: Vec<ImportedListing>,
    pub issues: Vec<RecordIssue>,
}

/// Resultado da leitura da planilha de proprietários.
#[derive(Debug, Default)]
pub struct ParsedOwnerSheet {
    pub total_records: usize,
    pub rows: Vec<OwnerRow>,
    pub issues: Vec<RecordIssue>,
}

fn issue(kind: ImportErrorKind, record_ref: Option<&str>, message: impl Into<String>) -> RecordIssue {
    RecordIssue {
        kind,
        record_ref: record_ref.map(str::to_string),
        message: message.into(),
    }
}

// ---
// Feed XML (VRSync: ListingDataFeed/Listings/Listing)
// ---

// Campos de um `Listing` ainda como texto, indexados pelo caminho relativo
// ("Details/ListPrice", "Location/State@abbreviation"...).
#[derive(Debug, Default)]
struct RawListing {
    fields: HashMap<String, String>,
    features: Vec<String>,
    media: Vec<PropertyImage>,
    pending_caption: Option<String>,
}

impl RawListing {
    fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    fn owned(&self, key: &str) -> Option<String> {
        self.get(key).map(str::to_string)
    }

    fn push_text(&mut self, path: &str, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        match path {
            "Details/Features/Feature" => self.features.push(text.to_string()),
            "Media/Item" => {
                let order = self.media.len() as i32;
                self.media.push(PropertyImage {
                    url: text.to_string(),
                    caption: self.pending_caption.take(),
                    order,
                });
            }
            // Pedaços de texto e CDATA do mesmo elemento viram um valor só.
            _ => {
                self.fields
                    .entry(path.to_string())
                    .and_modify(|v| {
                        v.push(' ');
                        v.push_str(text);
                    })
                    .or_insert_with(|| text.to_string());
            }
        }
    }

    fn push_attributes(&mut self, relative: &str, element: &BytesStart) -> Result<(), String> {
        for attr in element.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| format!("Atributo inválido em {}: {}", relative, err))?
                .into_owned();
            if relative == "Media/Item" && key == "caption" {
                self.pending_caption = Some(value).filter(|c| !c.trim().is_empty());
            } else {
                self.fields.insert(format!("{}@{}", relative, key), value);
            }
        }
        Ok(())
    }
}

/// Aceita `450000`, `450000.50`, `450.000,50` e `450000,50`.
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let v = value.trim().trim_start_matches("R$").trim();
    let normalized = match (v.contains(','), v.contains('.')) {
        (true, true) => v.replace('.', "").replace(',', "."),
        (true, false) => v.replace(',', "."),
        _ => v.to_string(),
    };
    Decimal::from_str(&normalized).ok()
}

pub fn parse_property_type(value: &str) -> Option<PropertyType> {
    let v = value.to_lowercase();
    let has = |needle: &str| v.contains(needle);

    if has("new development") || has("lançamento") || has("lancamento") {
        Some(PropertyType::NewDevelopment)
    } else if has("condo") && (has("lot") || has("land")) {
        Some(PropertyType::CondoLot)
    } else if has("building lot") || has("building land") {
        Some(PropertyType::BuildingLot)
    } else if has("land") || has("lot") || has("terreno") {
        Some(PropertyType::Land)
    } else if has("commercial") || has("office") || has("store") || has("business") || has("comercial") {
        Some(PropertyType::Commercial)
    } else if has("apartment") || has("flat") || has("penthouse") || has("studio") || has("condo") || has("apartamento") {
        Some(PropertyType::Apartment)
    } else if has("home") || has("house") || has("sobrado") || has("villa") || has("farm") || has("casa") {
        Some(PropertyType::House)
    } else {
        None
    }
}

pub fn parse_transaction_type(value: &str) -> Option<TransactionType> {
    match value.trim().to_lowercase().as_str() {
        "for sale" | "sale" | "venda" => Some(TransactionType::Sale),
        "for rent" | "rent" | "aluguel" | "locação" | "locacao" => Some(TransactionType::Rent),
        "sale/rent" | "for sale/rent" | "both" | "venda/aluguel" => Some(TransactionType::Both),
        _ => None,
    }
}

fn decimal_field(raw: &RawListing, key: &str, id: &str) -> Result<Option<Decimal>, RecordIssue> {
    match raw.get(key) {
        None => Ok(None),
        Some(v) => parse_decimal(v)
            .map(Some)
            .ok_or_else(|| issue(ImportErrorKind::InvalidValue, Some(id), format!("{} inválido: {}", key, v))),
    }
}

fn int_field(raw: &RawListing, key: &str, id: &str) -> Result<Option<i32>, RecordIssue> {
    match raw.get(key) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<i32>()
            .ok()
            .filter(|n| *n >= 0)
            .map(Some)
            .ok_or_else(|| issue(ImportErrorKind::InvalidValue, Some(id), format!("{} inválido: {}", key, v))),
    }
}

fn into_listing(raw: RawListing) -> Result<ImportedListing, RecordIssue> {
    let Some(external_id) = raw.owned("ListingID") else {
        return Err(issue(
            ImportErrorKind::MissingField,
            raw.get("Title"),
            "Anúncio sem ListingID",
        ));
    };
    let id = external_id.as_str();
    let title = raw
        .owned("Title")
        .ok_or_else(|| issue(ImportErrorKind::MissingField, Some(id), "Anúncio sem Title"))?;

    let property_type = match raw.get("Details/PropertyType") {
        Some(v) => parse_property_type(v).ok_or_else(|| {
            issue(ImportErrorKind::InvalidValue, Some(id), format!("PropertyType desconhecido: {}", v))
        })?,
        None => return Err(issue(ImportErrorKind::MissingField, Some(id), "Anúncio sem PropertyType")),
    };

    let sale_price = decimal_field(&raw, "Details/ListPrice", id)?;
    let rental_price = decimal_field(&raw, "Details/RentalPrice", id)?;
    let area_sqm = match decimal_field(&raw, "Details/LivingArea", id)? {
        Some(area) => Some(area),
        None => decimal_field(&raw, "Details/LotArea", id)?,
    };

    // Sem TransactionType, os preços dizem o que é.
    let transaction_type = match raw.get("TransactionType") {
        Some(v) => parse_transaction_type(v).ok_or_else(|| {
            issue(ImportErrorKind::InvalidValue, Some(id), format!("TransactionType desconhecido: {}", v))
        })?,
        None => match (sale_price, rental_price) {
            (Some(_), Some(_)) => TransactionType::Both,
            (None, Some(_)) => TransactionType::Rent,
            _ => TransactionType::Sale,
        },
    };

    let state = raw
        .owned("Location/State@abbreviation")
        .or_else(|| raw.owned("Location/State"))
        .map(|s| s.to_uppercase());

    Ok(ImportedListing {
        bedrooms: int_field(&raw, "Details/Bedrooms", id)?,
        bathrooms: int_field(&raw, "Details/Bathrooms", id)?,
        parking_spaces: int_field(&raw, "Details/Garage", id)?,
        description: raw.owned("Details/Description"),
        street: raw.owned("Location/Address"),
        number: raw.owned("Location/StreetNumber"),
        neighborhood: raw.owned("Location/Neighborhood"),
        city: raw.owned("Location/City"),
        zip_code: raw.owned("Location/PostalCode"),
        external_id: external_id.clone(),
        title,
        property_type,
        transaction_type,
        sale_price,
        rental_price,
        area_sqm,
        state,
        images: raw.media,
        features: raw.features,
    })
}

/// Lê o feed inteiro. `Err` só quando o documento está malformado.
pub fn parse_listing_feed(data: &[u8]) -> Result<ParsedFeed, String> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut feed = ParsedFeed::default();
    let mut buf = Vec::new();
    // Caminho completo desde a raiz; `listing_depth` marca onde o Listing começa.
    let mut path: Vec<String> = Vec::new();
    let mut listing_depth: Option<usize> = None;
    let mut current: Option<RawListing> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| format!("XML inválido na posição {}: {}", reader.error_position(), e))?;

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                path.push(name.clone());

                if name == "Listing" && current.is_none() {
                    listing_depth = Some(path.len());
                    current = Some(RawListing::default());
                } else if let (Some(raw), Some(depth)) = (current.as_mut(), listing_depth) {
                    raw.push_attributes(&path[depth..].join("/"), &e)?;
                }
            }
            // `<State abbreviation="SP"/>`: só atributos, sem texto.
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if let (Some(raw), Some(depth)) = (current.as_mut(), listing_depth) {
                    path.push(name);
                    let pushed = raw.push_attributes(&path[depth..].join("/"), &e);
                    path.pop();
                    pushed?;
                } else if name == "Listing" {
                    feed.total_records += 1;
                    feed.issues.push(issue(ImportErrorKind::MissingField, None, "Anúncio sem ListingID"));
                }
            }
            Event::Text(e) => {
                if let (Some(raw), Some(depth)) = (current.as_mut(), listing_depth) {
                    let text = e.unescape().map_err(|err| format!("Texto inválido: {}", err))?;
                    raw.push_text(&path[depth..].join("/"), &text);
                }
            }
            Event::CData(e) => {
                if let (Some(raw), Some(depth)) = (current.as_mut(), listing_depth) {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    raw.push_text(&path[depth..].join("/"), &text);
                }
            }
            Event::End(_) => {
                if listing_depth == Some(path.len()) {
                    if let Some(raw) = current.take() {
                        feed.total_records += 1;
                        match into_listing(raw) {
                            Ok(listing) => feed.listings.push(listing),
                            Err(problem) => feed.issues.push(problem),
                        }
                    }
                    listing_depth = None;
                }
                path.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if current.is_some() || !path.is_empty() {
        return Err("XML truncado: elementos sem fechamento".into());
    }
    Ok(feed)
}

// ---
// Planilha de proprietários (texto delimitado)
// ---

/// Planilhas binárias (.xls OLE ou .xlsx ZIP) não são lidas.
pub fn is_binary_spreadsheet(data: &[u8]) -> bool {
    data.starts_with(&OLE_MAGIC) || data.starts_with(&ZIP_MAGIC)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OwnerColumn {
    Reference,
    Name,
    Email,
    Phone,
    Document,
}

fn owner_column(header: &str) -> Option<OwnerColumn> {
    match generate_slug(header).as_str() {
        "referencia" | "reference" | "codigo" | "ref" => Some(OwnerColumn::Reference),
        "proprietario" | "owner" | "nome" | "name" => Some(OwnerColumn::Name),
        "email" | "e-mail" => Some(OwnerColumn::Email),
        "telefone" | "phone" | "celular" => Some(OwnerColumn::Phone),
        "documento" | "document" | "cpf" | "cnpj" | "cpf-cnpj" => Some(OwnerColumn::Document),
        _ => None,
    }
}

// `;` é o separador padrão das planilhas exportadas em pt-BR.
fn detect_delimiter(data: &[u8]) -> u8 {
    let first_line = data.split(|b| *b == b'\n').next().unwrap_or_default();
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    let commas = first_line.iter().filter(|b| **b == b',').count();
    if semicolons > commas { b';' } else { b',' }
}

/// UTF-8 (com ou sem BOM); fora disso, Windows-1252, padrão do Excel em pt-BR.
pub fn decode_sheet(data: &[u8]) -> Cow<'_, str> {
    let data = data.strip_prefix(&UTF8_BOM[..]).unwrap_or(data);
    match std::str::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => encoding_rs::WINDOWS_1252.decode_without_bom_handling(data).0,
    }
}

pub fn parse_owner_sheet(data: &[u8]) -> Result<ParsedOwnerSheet, String> {
    if is_binary_spreadsheet(data) {
        return Err("Planilha binária (XLS/XLSX) não suportada; exporte como CSV".into());
    }

    let text = decode_sheet(data);
    let data = text.as_bytes();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(data))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let headers = reader.headers().map_err(|e| format!("Cabeçalho inválido: {}", e))?.clone();
    let columns: Vec<Option<OwnerColumn>> = headers.iter().map(owner_column).collect();
    if !columns.contains(&Some(OwnerColumn::Reference)) {
        return Err("Coluna de referência do imóvel não encontrada".into());
    }

    let mut sheet = ParsedOwnerSheet::default();
    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                sheet.total_records += 1;
                sheet.issues.push(issue(ImportErrorKind::XlsParse, None, format!("Linha ilegível: {}", e)));
                continue;
            }
        };
        if record.iter().all(|v| v.is_empty()) {
            continue;
        }
        sheet.total_records += 1;

        let line = record.position().map(|p| p.line() as usize).unwrap_or_default();
        let mut row = OwnerRow { line, ..Default::default() };
        for (value, column) in record.iter().zip(&columns) {
            let value = Some(value.to_string()).filter(|v| !v.is_empty());
            match column {
                Some(OwnerColumn::Reference) => row.reference = value.unwrap_or_default(),
                Some(OwnerColumn::Name) => row.name = value,
                Some(OwnerColumn::Email) => row.email = value,
                Some(OwnerColumn::Phone) => row.phone = value,
                Some(OwnerColumn::Document) => row.document = value,
                None => {}
            }
        }

        if row.reference.is_empty() {
            sheet.issues.push(issue(
                ImportErrorKind::MissingField,
                Some(&format!("linha {}", line)),
                "Linha sem referência do imóvel",
            ));
            continue;
        }
        sheet.rows.push(row);
    }
    Ok(sheet)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListingDataFeed xmlns="http://www.vivareal.com/schemas/1.0/VRSync">
  <Header><Provider>Union</Provider></Header>
  <Listings>
    <Listing>
      <ListingID>AP-001</ListingID>
      <Title><![CDATA[Apartamento 2 quartos & varanda]]></Title>
      <TransactionType>For Sale</TransactionType>
      <Details>
        <PropertyType>Residential / Apartment</PropertyType>
        <Description>Bem localizado</Description>
        <ListPrice currency="BRL">450000</ListPrice>
        <LivingArea unit="square metres">68</LivingArea>
        <Bedrooms>2</Bedrooms>
        <Bathrooms>1</Bathrooms>
        <Garage type="Parking Space">1</Garage>
        <Features><Feature>Pool</Feature><Feature>Gym</Feature></Features>
      </Details>
      <Location displayAddress="All">
        <Address>Rua das Flores</Address>
        <StreetNumber>100</StreetNumber>
        <Neighborhood>Centro</Neighborhood>
        <City>São Paulo</City>
        <State abbreviation="SP">São Paulo</State>
        <PostalCode>01000-000</PostalCode>
      </Location>
      <Media>
        <Item medium="image" caption="Sala">https://cdn.example.com/1.jpg</Item>
        <Item medium="image">https://cdn.example.com/2.jpg</Item>
      </Media>
    </Listing>
    <Listing>
      <Title>Sem código</Title>
    </Listing>
    <Listing>
      <ListingID>CS-9</ListingID>
      <Title>Casa</Title>
      <Details>
        <PropertyType>Residential / Home</PropertyType>
        <RentalPrice>abc</RentalPrice>
      </Details>
    </Listing>
  </Listings>
</ListingDataFeed>"#;

    #[test]
    fn feed_yields_listings_and_record_issues() {
        let feed = parse_listing_feed(FEED.as_bytes()).expect("feed");
        assert_eq!(feed.total_records, 3);
        assert_eq!(feed.listings.len(), 1);
        assert_eq!(feed.issues.len(), 2);
        assert_eq!(feed.issues[0].kind, ImportErrorKind::MissingField);
        assert_eq!(feed.issues[1].kind, ImportErrorKind::InvalidValue);
        assert_eq!(feed.issues[1].record_ref.as_deref(), Some("CS-9"));
    }

    #[test]
    fn listing_fields_are_mapped() {
        let feed = parse_listing_feed(FEED.as_bytes()).expect("feed");
        let l = &feed.listings[0];
        assert_eq!(l.external_id, "AP-001");
        assert_eq!(l.title, "Apartamento 2 quartos & varanda");
        assert_eq!(l.property_type, PropertyType::Apartment);
        assert_eq!(l.transaction_type, TransactionType::Sale);
        assert_eq!(l.sale_price, Some(Decimal::new(450_000, 0)));
        assert_eq!(l.area_sqm, Some(Decimal::new(68, 0)));
        assert_eq!(l.parking_spaces, Some(1));
        assert_eq!(l.state.as_deref(), Some("SP"));
        assert_eq!(l.features, vec!["Pool".to_string(), "Gym".to_string()]);
        assert_eq!(l.images.len(), 2);
        assert_eq!(l.images[0].caption.as_deref(), Some("Sala"));
        assert_eq!(l.images[1].order, 1);
    }

    #[test]
    fn malformed_document_is_fatal() {
        assert!(parse_listing_feed(b"<ListingDataFeed><Listings><Listing></Listings>").is_err());
        assert!(parse_listing_feed(b"<ListingDataFeed><Listings>").is_err());
    }

    #[test]
    fn decimals_accept_brazilian_format() {
        assert_eq!(parse_decimal("450.000,50"), Some(Decimal::new(45_000_050, 2)));
        assert_eq!(parse_decimal("R$ 1200"), Some(Decimal::new(1200, 0)));
        assert_eq!(parse_decimal("1200.5"), Some(Decimal::new(12_005, 1)));
        assert_eq!(parse_decimal("mil"), None);
    }

    #[test]
    fn property_and_transaction_types() {
        assert_eq!(parse_property_type("Residential / Condo Lot"), Some(PropertyType::CondoLot));
        assert_eq!(parse_property_type("Residential / Land Lot"), Some(PropertyType::Land));
        assert_eq!(parse_property_type("Commercial / Office"), Some(PropertyType::Commercial));
        assert_eq!(parse_property_type("Residential / Home"), Some(PropertyType::House));
        assert_eq!(parse_property_type("Boat"), None);
        assert_eq!(parse_transaction_type("Sale/Rent"), Some(TransactionType::Both));
        assert_eq!(parse_transaction_type("For Rent"), Some(TransactionType::Rent));
    }

    #[test]
    fn owner_sheet_matches_pt_headers() {
        let csv = "Referência;Proprietário;E-mail;Telefone;CPF\nAP-001;José;jose@example.com;11987654321;52998224725\n;Sem ref;;;\n";
        let sheet = parse_owner_sheet(csv.as_bytes()).expect("sheet");
        assert_eq!(sheet.total_records, 2);
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].reference, "AP-001");
        assert_eq!(sheet.rows[0].name.as_deref(), Some("José"));
        assert_eq!(sheet.rows[0].document.as_deref(), Some("52998224725"));
        assert_eq!(sheet.issues.len(), 1);
    }

    #[test]
    fn owner_sheet_matches_en_headers_with_commas() {
        let csv = "reference,owner,email,phone,document\nCS-9,Mary,,,\n";
        let sheet = parse_owner_sheet(csv.as_bytes()).expect("sheet");
        assert_eq!(sheet.rows[0].reference, "CS-9");
        assert_eq!(sheet.rows[0].email, None);
    }

    #[test]
    fn binary_spreadsheets_are_rejected() {
        let mut xls = OLE_MAGIC.to_vec();
        xls.extend_from_slice(b"rest");
        assert!(is_binary_spreadsheet(&xls));
        assert!(parse_owner_sheet(&xls).is_err());
        assert!(parse_owner_sheet(b"PK\x03\x04zip").is_err());
    }

    #[test]
    fn sheet_without_reference_column_is_rejected() {
        assert!(parse_owner_sheet(b"nome,email\nJose,j@x.com\n").is_err());
    }

    #[test]
    fn windows_1252_sheet_is_decoded() {
        let sheet = parse_owner_sheet(b"Refer\xeancia;Propriet\xe1rio\nAP-1;Jos\xe9\n").expect("sheet");
        assert_eq!(sheet.rows.len(), 1);
        assert_eq!(sheet.rows[0].reference, "AP-1");
        assert_eq!(sheet.rows[0].name.as_deref(), Some("José"));
    }

    #[test]
    fn utf8_bom_is_ignored() {
        let mut data = UTF8_BOM.to_vec();
        data.extend_from_slice("Referência;Nome\nAP-2;Ana\n".as_bytes());
        let sheet = parse_owner_sheet(&data).expect("sheet");
        assert_eq!(sheet.rows[0].reference, "AP-2");
        assert_eq!(decode_sheet(b"abc"), "abc");
    }

    #[test]
    fn self_closing_elements_keep_their_attributes() {
        let xml = br#"<ListingDataFeed><Listings>
            <Listing>
              <ListingID>AP-7</ListingID>
              <Title>Casa</Title>
              <Details><PropertyType>Residential / Home</PropertyType></Details>
              <Location><City>Campinas</City><State abbreviation="sp"/></Location>
            </Listing>
            <Listing/>
        </Listings></ListingDataFeed>"#;
        let feed = parse_listing_feed(xml).expect("feed");
        assert_eq!(feed.total_records, 2);
        assert_eq!(feed.listings[0].state.as_deref(), Some("SP"));
        assert_eq!(feed.issues.len(), 1);
        assert_eq!(feed.issues[0].kind, ImportErrorKind::MissingField);
    }

    #[test]
    fn text_and_cdata_chunks_are_separated() {
        let xml = br#"<ListingDataFeed><Listings><Listing>
            <ListingID>AP-8</ListingID>
            <Title>Casa<![CDATA[com piscina]]></Title>
            <Details><PropertyType>Residential / Home</PropertyType></Details>
        </Listing></Listings></ListingDataFeed>"#;
        let feed = parse_listing_feed(xml).expect("feed");
        assert_eq!(feed.listings[0].title, "Casa com piscina");
    }
}
