//! Client commands.

use online_shop_core::{Client, ClientDraft, ClientId, ClientStatus};
use online_shop_storefront::slices::Seeding;
use online_shop_storefront::{AppError, NotFoundError};

use crate::Shop;

/// Fields to change on a client; `None` keeps the current value.
#[derive(Debug, Default)]
pub struct ClientEdit {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub zip_code: Option<String>,
    pub city: Option<String>,
    pub status: Option<ClientStatus>,
}

impl ClientEdit {
    fn apply(self, client: &Client) -> (ClientDraft, ClientStatus) {
        let mut draft = client.draft();
        let fields = [
            (self.first_name, &mut draft.first_name),
            (self.last_name, &mut draft.last_name),
            (self.email, &mut draft.email),
            (self.phone, &mut draft.phone),
            (self.street, &mut draft.street),
            (self.number, &mut draft.number),
            (self.zip_code, &mut draft.zip_code),
            (self.city, &mut draft.city),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        (draft, self.status.unwrap_or(client.status))
    }
}

/// Print every client, seeding from the remote users the first time.
pub async fn list(shop: &Shop) -> Result<(), AppError> {
    match shop.init_clients().await? {
        Seeding::Seeded(count) => tracing::info!(count, "Seeded clients from remote users"),
        Seeding::Restored(_) => {}
    }
    print_clients(&shop.clients().clients());
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_clients(clients: &[Client]) {
    if clients.is_empty() {
        println!("No clients.");
        return;
    }
    for client in clients {
        println!(
            "{:>14}  {:<24}  {:<28}  {:<11}  {}",
            client.id,
            client.full_name(),
            client.email,
            client.status,
            client.created_at.format("%Y-%m-%d"),
        );
    }
}

/// Create a client.
pub fn add(shop: &Shop, draft: ClientDraft) -> Result<(), AppError> {
    // Load first so a fresh store keeps whatever is already saved.
    shop.clients().load_from_storage();
    let client = shop.clients().add(draft)?;
    tracing::info!(id = %client.id, name = %client.full_name(), "Client created");
    Ok(())
}

/// Edit a client. Id and creation time never change.
pub fn update(shop: &Shop, id: ClientId, edit: ClientEdit) -> Result<(), AppError> {
    shop.clients().load_from_storage();
    let client = shop.clients().get(id).ok_or(NotFoundError {
        entity: "client",
        id: id.as_i64(),
    })?;
    let (draft, status) = edit.apply(&client);
    let edited = Client::from_draft(client.id, draft, client.created_at, status)?;

    let client = shop.clients().update(edited)?;
    tracing::info!(id = %client.id, status = %client.status, "Client updated");
    Ok(())
}

/// Delete a client. Unknown ids are ignored.
pub fn remove(shop: &Shop, id: ClientId) {
    shop.clients().load_from_storage();
    shop.clients().remove(id);
    tracing::info!(%id, "Client removed");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn client() -> Client {
        Client::from_draft(
            ClientId::new(7),
            ClientDraft {
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
                phone: "555-0100".to_string(),
                street: "Main Street".to_string(),
                number: "12".to_string(),
                zip_code: "10001".to_string(),
                city: "London".to_string(),
            },
            Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap(),
            ClientStatus::Activated,
        )
        .unwrap()
    }

    #[test]
    fn test_edit_only_touches_given_fields() {
        let (draft, status) = ClientEdit {
            city: Some("Paris".to_string()),
            ..ClientEdit::default()
        }
        .apply(&client());

        assert_eq!(draft.city, "Paris");
        assert_eq!(draft.first_name, "Ada");
        assert_eq!(draft.email, "ada@example.com");
        assert_eq!(status, ClientStatus::Activated);
    }

    #[test]
    fn test_edit_can_deactivate() {
        let (draft, status) = ClientEdit {
            status: Some(ClientStatus::Deactivated),
            ..ClientEdit::default()
        }
        .apply(&client());

        assert_eq!(status, ClientStatus::Deactivated);
        assert_eq!(draft, client().draft());
    }
}
