//! Confirmation email delivery over a transactional-email HTTP API.
//! Used by: handlers::register, state.

use serde::Serialize;
use url::Url;

use crate::config::MailConfig;
use crate::error::{Error, Result};

const SUBJECT: &str = "Confirm Your Email";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Address {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfirmationEmail {
    pub from: Address,
    pub to: Vec<Address>,
    pub subject: String,
    pub html: String,
}

impl ConfirmationEmail {
    pub fn new(from: Address, to: &str, link: &str) -> Self {
        Self {
            from,
            to: vec![Address { email: to.to_owned(), name: None }],
            subject: SUBJECT.to_owned(),
            html: confirmation_html(link),
        }
    }
}

pub fn confirmation_link(base: &str, email: &str, token: &str) -> Result<String> {
    let mut url = Url::parse(base)
        .map_err(|e| Error::InvalidInput(format!("VERIFY_LINK_BASE is not a URL: {e}")))?;
    url.query_pairs_mut()
        .append_pair("email", email)
        .append_pair("token", token);
    Ok(url.into())
}

fn confirmation_html(link: &str) -> String {
    let href = link.replace('&', "&amp;").replace('"', "&quot;");
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8" /><title>Email Confirmation</title></head>
<body>
  <h1>Email Confirmation</h1>
  <p>Thank you for signing up! Please confirm your email address by clicking the button below:</p>
  <a href="{href}">Confirm Email</a>
</body>
</html>"#
    )
}

pub struct Mailer {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    from: Address,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> Self {
        tracing::info!(api_url = %config.api_url, "mail delivery enabled");
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
            from: Address {
                email: config.from_email.clone(),
                name: Some(config.from_name.clone()),
            },
        }
    }

    pub fn sender(&self) -> Address {
        self.from.clone()
    }

    pub async fn send(&self, email: &ConfirmationEmail) -> Result<()> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(email)
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("mail request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Upstream(format!("mail api returned {status}: {body}")));
        }
        tracing::debug!(status = %status, "confirmation email accepted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sender() -> Address {
        Address { email: "no-reply@example.com".into(), name: Some("Verigate".into()) }
    }

    #[test]
    fn link_encodes_query_parameters() -> Result<()> {
        let link = confirmation_link("http://localhost:3000/verify-email", "a+b@x.com", "abc_-123")?;
        assert_eq!(link, "http://localhost:3000/verify-email?email=a%2Bb%40x.com&token=abc_-123");
        Ok(())
    }

    #[test]
    fn invalid_base_rejected() {
        assert!(matches!(
            confirmation_link("not a url", "a@x.com", "t"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn email_body_has_expected_shape() -> Result<()> {
        let email = ConfirmationEmail::new(sender(), "a@x.com", "http://h/v?email=a&token=t");
        let json = serde_json::to_value(&email)?;
        assert_eq!(json["from"]["email"], "no-reply@example.com");
        assert_eq!(json["from"]["name"], "Verigate");
        assert_eq!(json["to"][0]["email"], "a@x.com");
        assert!(json["to"][0].get("name").is_none());
        assert_eq!(json["subject"], "Confirm Your Email");
        Ok(())
    }

    #[test]
    fn html_escapes_link_in_attribute() {
        let email = ConfirmationEmail::new(sender(), "a@x.com", "http://h/v?email=a&token=t");
        assert!(email.html.contains(r#"href="http://h/v?email=a&amp;token=t""#));
    }
}
