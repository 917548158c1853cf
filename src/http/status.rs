//! # Códigos de Estado HTTP
//!
//! El servidor solo emite `200 OK`, pero el cliente del load driver tiene que
//! clasificar cualquier código que reciba en la status line. Por eso el código
//! es un newtype sobre `u16` en vez de un enum cerrado.

/// Código de estado HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// 200 OK - La petición fue exitosa
    pub const OK: StatusCode = StatusCode(200);

    /// Construye un código a partir de su valor numérico
    ///
    /// Retorna `None` si está fuera del rango 100..=599.
    ///
    /// # Ejemplo
    /// ```
    /// use server_bench::http::StatusCode;
    /// assert_eq!(StatusCode::from_u16(200), Some(StatusCode::OK));
    /// assert_eq!(StatusCode::from_u16(42), None);
    /// ```
    pub fn from_u16(code: u16) -> Option<Self> {
        (100..600).contains(&code).then_some(StatusCode(code))
    }

    /// Convierte el código a su valor numérico
    pub fn as_u16(&self) -> u16 {
        self.0
    }

    /// Reason phrase estándar para los códigos más comunes
    pub fn reason_phrase(&self) -> &'static str {
        match self.0 {
            200 => "OK",
            204 => "No Content",
            400 => "Bad Request",
            404 => "Not Found",
            500 => "Internal Server Error",
            503 => "Service Unavailable",
            _ => "Unknown",
        }
    }

    /// Verifica si el código indica éxito (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.0, self.reason_phrase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u16_range() {
        assert_eq!(StatusCode::from_u16(200), Some(StatusCode::OK));
        assert!(StatusCode::from_u16(599).is_some());
        assert!(StatusCode::from_u16(99).is_none());
        assert!(StatusCode::from_u16(600).is_none());
    }

    #[test]
    fn test_is_success() {
        assert!(StatusCode::OK.is_success());
        assert!(StatusCode::from_u16(204).unwrap().is_success());
        assert!(!StatusCode::from_u16(404).unwrap().is_success());
        assert!(!StatusCode::from_u16(503).unwrap().is_success());
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::OK.to_string(), "200 OK");
        assert_eq!(StatusCode::from_u16(404).unwrap().to_string(), "404 Not Found");
        assert_eq!(StatusCode::from_u16(418).unwrap().to_string(), "418 Unknown");
    }
}
