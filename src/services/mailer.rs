// src/services/mailer.rs

use async_trait::async_trait;

/// Mensagem de saída (texto simples).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()>;
}

/// Não envia nada: apenas registra no log. Usado enquanto não há provedor SMTP.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: String) -> Self {
        Self { from }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: OutgoingMail) -> anyhow::Result<()> {
        tracing::info!(from = %self.from, to = %mail.to, subject = %mail.subject, "📧 E-mail enfileirado");
        tracing::debug!(body = %mail.body);
        Ok(())
    }
}
