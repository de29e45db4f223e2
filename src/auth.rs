/// Bearer token for the object store endpoint.
///
/// `Debug` never prints the value, so tokens can sit inside logged structs.
#[derive(Clone)]
pub struct Token(String);

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Token {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<redacted>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_from_str_creates_token() {
        let token = Token::from("s3-gateway-token");

        assert_eq!(token.as_str(), "s3-gateway-token");
    }

    #[test]
    fn test_token_debug_redacts_value() {
        let token = Token::from("very_secret_upload_token");

        let debug_output = format!("{token:?}");

        assert_eq!(debug_output, "<redacted>");
        assert!(!debug_output.contains("secret"));
    }

    #[test]
    fn test_token_debug_in_struct() {
        #[derive(Debug)]
        #[allow(dead_code)]
        struct Upload {
            token: Token,
            bucket: String,
        }

        let upload = Upload {
            token: Token::from("super_secret_token"),
            bucket: String::from("status-feeds"),
        };

        let debug_output = format!("{upload:?}");

        assert!(debug_output.contains("<redacted>"));
        assert!(!debug_output.contains("super_secret_token"));
        assert!(debug_output.contains("status-feeds"));
    }
}
