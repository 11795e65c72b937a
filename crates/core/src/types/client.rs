//! Client entity, owned entirely by the local store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::email::Email;
use super::id::ClientId;
use super::status::ClientStatus;
use super::validation::{ValidationError, require_min_chars, require_present};

/// Postal address, stored flat on the client record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    /// House number. Older records hold a JSON number here.
    #[serde(deserialize_with = "string_or_number")]
    pub number: String,
    pub zip_code: String,
    pub city: String,
}

/// A customer record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub first_name: String,
    pub last_name: String,
    pub email: Email,
    pub phone: String,
    #[serde(flatten)]
    pub address: Address,
    pub created_at: DateTime<Utc>,
    pub status: ClientStatus,
}

/// User input for creating or editing a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDraft {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub street: String,
    pub number: String,
    pub zip_code: String,
    pub city: String,
}

impl ClientDraft {
    fn validate(mut self) -> Result<(Self, Email), ValidationError> {
        require_min_chars(&mut self.first_name, "first name", 2)?;
        require_min_chars(&mut self.last_name, "last name", 2)?;
        let email = Email::parse(&self.email)?;
        require_min_chars(&mut self.street, "street", 3)?;
        require_present(&mut self.number, "number")?;
        require_present(&mut self.zip_code, "zip code")?;
        require_min_chars(&mut self.city, "city", 2)?;
        require_present(&mut self.phone, "phone")?;
        Ok((self, email))
    }
}

impl Client {
    /// Build a client from validated input.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] when a name or the city is shorter than
    /// 2 characters, the street shorter than 3, the email is malformed, or
    /// number, zip code or phone is blank.
    pub fn from_draft(
        id: ClientId,
        draft: ClientDraft,
        created_at: DateTime<Utc>,
        status: ClientStatus,
    ) -> Result<Self, ValidationError> {
        let (draft, email) = draft.validate()?;
        Ok(Self {
            id,
            first_name: draft.first_name,
            last_name: draft.last_name,
            email,
            phone: draft.phone,
            address: Address {
                street: draft.street,
                number: draft.number,
                zip_code: draft.zip_code,
                city: draft.city,
            },
            created_at,
            status,
        })
    }

    /// The editable fields of this client.
    #[must_use]
    pub fn draft(&self) -> ClientDraft {
        ClientDraft {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.to_string(),
            phone: self.phone.clone(),
            street: self.address.street.clone(),
            number: self.address.number.clone(),
            zip_code: self.address.zip_code.clone(),
            city: self.address.city.clone(),
        }
    }

    /// Re-validate the editable fields, keeping id, timestamp and status.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the edited fields break a draft rule.
    pub fn validated(self) -> Result<Self, ValidationError> {
        Self::from_draft(self.id, self.draft(), self.created_at, self.status)
    }

    /// "First Last" for display.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn draft() -> ClientDraft {
        ClientDraft {
            first_name: "john".to_string(),
            last_name: "doe".to_string(),
            email: "john@gmail.com".to_string(),
            phone: "1-570-236-7033".to_string(),
            street: "new road".to_string(),
            number: "7682".to_string(),
            zip_code: "12926-3874".to_string(),
            city: "kilcoole".to_string(),
        }
    }

    fn created_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 4, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_from_draft() {
        let client = Client::from_draft(
            ClientId::new(10),
            draft(),
            created_at(),
            ClientStatus::Activated,
        )
        .unwrap();
        assert_eq!(client.full_name(), "john doe");
        assert_eq!(client.address.city, "kilcoole");
        assert_eq!(client.email.as_str(), "john@gmail.com");
    }

    #[test]
    fn test_draft_rules() {
        let mut bad = draft();
        bad.first_name = "j".to_string();
        assert!(matches!(
            Client::from_draft(ClientId::new(1), bad, created_at(), ClientStatus::Activated),
            Err(ValidationError::TooShort {
                field: "first name",
                ..
            })
        ));

        let mut bad = draft();
        bad.email = "john".to_string();
        assert!(matches!(
            Client::from_draft(ClientId::new(1), bad, created_at(), ClientStatus::Activated),
            Err(ValidationError::InvalidEmail(_))
        ));

        let mut bad = draft();
        bad.phone = "  ".to_string();
        assert_eq!(
            Client::from_draft(ClientId::new(1), bad, created_at(), ClientStatus::Activated),
            Err(ValidationError::Required { field: "phone" })
        );
    }

    #[test]
    fn test_wire_format_is_flat_camel_case() {
        let client = Client::from_draft(
            ClientId::new(10),
            draft(),
            created_at(),
            ClientStatus::Deactivated,
        )
        .unwrap();
        let value = serde_json::to_value(&client).unwrap();
        assert_eq!(value["firstName"], "john");
        assert_eq!(value["zipCode"], "12926-3874");
        assert_eq!(value["status"], "deactivated");
        assert!(value.get("address").is_none());

        let back: Client = serde_json::from_value(value).unwrap();
        assert_eq!(back, client);
    }

    #[test]
    fn test_numeric_house_number_loads() {
        let json = r#"{"id":1,"firstName":"john","lastName":"doe","email":"john@gmail.com",
            "phone":"1-570-236-7033","street":"new road","number":7682,"zipCode":"12345-6789",
            "city":"kilcoole","createdAt":"2022-01-01T00:00:00.000Z","status":"activated"}"#;
        let client: Client = serde_json::from_str(json).unwrap();
        assert_eq!(client.address.number, "7682");
    }
}
