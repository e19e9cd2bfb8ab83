use mentor::{MentorClient, Notification, Page};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, print_json, print_rows};

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct NotificationRow {
    #[tabled(rename = "Notification")]
    pub text: String,
    #[tabled(rename = "URL")]
    pub url: String,
}

impl From<&Notification> for NotificationRow {
    fn from(notification: &Notification) -> Self {
        Self {
            text: notification.text.clone(),
            url: notification.url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct UnreadReport<'a> {
    unread_count: Option<u32>,
    unread: Vec<&'a Notification>,
}

fn unread(page: &Page<Notification>) -> Vec<&Notification> {
    page.results.iter().filter(|n| !n.is_read).collect()
}

/// Print the unread count and every unread notification on the first page.
pub(crate) async fn handle_notifications(
    client: &MentorClient,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let page = client.notifications().await?;
    let unread = unread(&page);

    match output {
        OutputFormat::Json => print_json(&UnreadReport {
            unread_count: page.meta.unread_count,
            unread,
        }),
        OutputFormat::Table => {
            let count = page.meta.unread_count.unwrap_or(unread.len() as u32);
            println!("Unread count: {}", console::style(count).bold());
            let rows = unread.into_iter().map(NotificationRow::from).collect();
            print_rows(rows, output, "No unread notifications.")
        }
    }
}

#[cfg(test)]
mod tests {
    use mentor::PageMeta;

    use super::*;

    fn notification(uuid: &str, is_read: bool) -> Notification {
        Notification {
            uuid: uuid.to_string(),
            is_read,
            url: format!("https://exercism.org/n/{uuid}"),
            text: format!("text {uuid}"),
        }
    }

    #[test]
    fn unread_keeps_server_order() {
        let page = Page {
            results: vec![
                notification("a", false),
                notification("b", true),
                notification("c", false),
            ],
            meta: PageMeta {
                current_page: 1,
                total_pages: 1,
                unread_count: Some(2),
            },
        };

        let uuids: Vec<_> = unread(&page).iter().map(|n| n.uuid.as_str()).collect();
        assert_eq!(uuids, vec!["a", "c"]);

        let row = NotificationRow::from(&page.results[0]);
        assert_eq!(row.text, "text a");
    }
}
