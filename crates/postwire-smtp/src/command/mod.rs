//! SMTP command builder.

use base64::Engine;

use crate::types::Address;

/// SMTP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client hostname
        hostname: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH LOGIN - Begin LOGIN authentication
    AuthLogin,
    /// Base64 answer to a 334 challenge
    AuthResponse {
        /// Already encoded response
        encoded: String,
    },
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Builds an AUTH LOGIN response by base64-encoding the given text.
    #[must_use]
    pub fn auth_response(text: &str) -> Self {
        Self::AuthResponse {
            encoded: base64::engine::general_purpose::STANDARD.encode(text.as_bytes()),
        }
    }

    /// Returns the command line without the CRLF terminator.
    #[must_use]
    pub fn line(&self) -> String {
        match self {
            Self::Ehlo { hostname } => format!("EHLO {hostname}"),
            Self::StartTls => "STARTTLS".to_string(),
            Self::AuthLogin => "AUTH LOGIN".to_string(),
            Self::AuthResponse { encoded } => encoded.clone(),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>"),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>"),
            Self::Data => "DATA".to_string(),
            Self::Quit => "QUIT".to_string(),
        }
    }

    /// Serializes the command to bytes.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = self.line().into_bytes();
        buf.extend_from_slice(b"\r\n");
        buf
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ehlo_command() {
        let cmd = Command::Ehlo {
            hostname: "client.example.com".to_string(),
        };
        assert_eq!(cmd.serialize(), b"EHLO client.example.com\r\n");
    }

    #[test]
    fn test_starttls_command() {
        assert_eq!(Command::StartTls.serialize(), b"STARTTLS\r\n");
    }

    #[test]
    fn test_auth_login_command() {
        assert_eq!(Command::AuthLogin.serialize(), b"AUTH LOGIN\r\n");
    }

    #[test]
    fn test_auth_response_encodes() {
        let cmd = Command::auth_response("user@example.com");
        assert_eq!(cmd.serialize(), b"dXNlckBleGFtcGxlLmNvbQ==\r\n");
    }

    #[test]
    fn test_mail_from_command() {
        let cmd = Command::MailFrom {
            from: Address::new("sender@example.com").unwrap(),
        };
        assert_eq!(cmd.serialize(), b"MAIL FROM:<sender@example.com>\r\n");
    }

    #[test]
    fn test_rcpt_to_command() {
        let cmd = Command::RcptTo {
            to: Address::new("recipient@example.com").unwrap(),
        };
        assert_eq!(cmd.serialize(), b"RCPT TO:<recipient@example.com>\r\n");
    }

    #[test]
    fn test_data_and_quit() {
        assert_eq!(Command::Data.serialize(), b"DATA\r\n");
        assert_eq!(Command::Quit.serialize(), b"QUIT\r\n");
        assert_eq!(Command::Quit.line(), "QUIT");
    }
}
