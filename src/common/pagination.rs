// src/common/pagination.rs

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 200;

#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Pagination {
    /// Padrão 50, máximo 200
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

/// Envelope das listagens.
#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub count: usize,
    pub limit: i64,
    pub offset: i64,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, pagination: &Pagination) -> Self {
        Self {
            count: data.len(),
            data,
            limit: pagination.limit(),
            offset: pagination.offset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_are_clamped() {
        assert_eq!(Pagination::default().limit(), 50);
        assert_eq!(Pagination { limit: Some(1000), offset: None }.limit(), 200);
        assert_eq!(Pagination { limit: Some(0), offset: Some(-5) }.limit(), 1);
        assert_eq!(Pagination { limit: None, offset: Some(-5) }.offset(), 0);
    }
}
