//! Response language selection.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::header::ACCEPT_LANGUAGE;
use axum::http::request::Parts;

use crate::chat::core::errors::ErrorKind;

/// Language used for user-facing error text.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Locale {
    /// English.
    #[default]
    En,
    /// Vietnamese.
    Vi,
}

impl Locale {
    /// Pick a locale from the first tag of an `Accept-Language` value.
    #[must_use]
    pub fn from_accept_language(value: Option<&str>) -> Self {
        let primary = value
            .and_then(|v| v.split(',').next())
            .and_then(|tag| tag.split(';').next())
            .and_then(|tag| tag.trim().split(['-', '_']).next())
            .unwrap_or_default();

        if primary.eq_ignore_ascii_case("vi") {
            Self::Vi
        } else {
            Self::En
        }
    }

    /// User-facing message for an error category.
    #[must_use]
    pub const fn message(self, kind: ErrorKind) -> &'static str {
        match (self, kind) {
            (Self::En, ErrorKind::Validation) => "bad request",
            (Self::En, ErrorKind::NotFound) => "not found",
            (Self::En, ErrorKind::Upstream) => "completion service unavailable",
            (Self::En, ErrorKind::Storage | ErrorKind::Internal) => "internal server error",
            (Self::Vi, ErrorKind::Validation) => "không thể thực hiện yêu cầu",
            (Self::Vi, ErrorKind::NotFound) => "không tìm thấy",
            (Self::Vi, ErrorKind::Upstream) => "dịch vụ hoàn thành không khả dụng",
            (Self::Vi, ErrorKind::Storage | ErrorKind::Internal) => "lỗi máy chủ nội bộ",
        }
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok());
        Ok(Self::from_accept_language(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_accept_language() {
        assert_eq!(Locale::from_accept_language(None), Locale::En);
        assert_eq!(Locale::from_accept_language(Some("vi")), Locale::Vi);
        assert_eq!(Locale::from_accept_language(Some("vi-VN,en;q=0.8")), Locale::Vi);
        assert_eq!(Locale::from_accept_language(Some("VI_vn")), Locale::Vi);
        assert_eq!(Locale::from_accept_language(Some("en-US,vi;q=0.9")), Locale::En);
        assert_eq!(Locale::from_accept_language(Some("")), Locale::En);
    }

    #[test]
    fn test_messages_are_translated() {
        assert_eq!(Locale::En.message(ErrorKind::Validation), "bad request");
        assert_eq!(
            Locale::Vi.message(ErrorKind::Validation),
            "không thể thực hiện yêu cầu"
        );
        assert_eq!(
            Locale::En.message(ErrorKind::Storage),
            Locale::En.message(ErrorKind::Internal)
        );
    }
}
