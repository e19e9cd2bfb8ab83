use clap::ValueEnum;
use mentor::{DiscussionOrder, DiscussionStatus, MentorClient, Partition};
use serde::Serialize;
use tabled::Tabled;

use crate::commands::output::{OutputFormat, print_json, print_rows};
use crate::config::Config;

/// Discussion status accepted on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum StatusArg {
    AwaitingMentor,
    #[default]
    AwaitingStudent,
    Finished,
}

impl From<StatusArg> for DiscussionStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::AwaitingMentor => DiscussionStatus::AwaitingMentor,
            StatusArg::AwaitingStudent => DiscussionStatus::AwaitingStudent,
            StatusArg::Finished => DiscussionStatus::Finished,
        }
    }
}

/// Listing order accepted on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OrderArg {
    #[default]
    Oldest,
    Recent,
    Exercise,
    Student,
}

impl From<OrderArg> for DiscussionOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Oldest => DiscussionOrder::Oldest,
            OrderArg::Recent => DiscussionOrder::Recent,
            OrderArg::Exercise => DiscussionOrder::Exercise,
            OrderArg::Student => DiscussionOrder::Student,
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
pub(crate) struct DiscussionRow {
    #[tabled(rename = "Discussion")]
    pub uuid: String,
    #[tabled(rename = "Action")]
    pub action: &'static str,
    #[tabled(rename = "URL")]
    pub url: String,
}

fn discussion_url(uuid: &str) -> String {
    format!("https://exercism.org/mentoring/discussions/{uuid}")
}

pub(crate) fn partition_rows(partition: &Partition) -> Vec<DiscussionRow> {
    let finish = partition.to_finish.iter().map(|uuid| DiscussionRow {
        uuid: uuid.clone(),
        action: "finish",
        url: discussion_url(uuid),
    });
    let nudge = partition.to_nudge.iter().map(|uuid| DiscussionRow {
        uuid: uuid.clone(),
        action: "nudge",
        url: discussion_url(uuid),
    });
    finish.chain(nudge).collect()
}

/// List discussions with no activity for `age_days`.
pub(crate) async fn handle_stale(
    client: &MentorClient,
    config: &Config,
    status: StatusArg,
    age_days: Option<u32>,
    order: OrderArg,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let age_days = age_days.unwrap_or(config.discussions.age_days);
    let stale = client
        .find_stale(status.into(), age_days, order.into())
        .await?;

    match output {
        OutputFormat::Json => print_json(&stale),
        OutputFormat::Table => {
            let rows = stale
                .iter()
                .map(|uuid| DiscussionRow {
                    uuid: uuid.clone(),
                    action: "-",
                    url: discussion_url(uuid),
                })
                .collect();
            print_rows(rows, output, "No stale discussions.")
        }
    }
}

/// Finish abandoned discussions and nudge the rest of the stale ones.
pub(crate) async fn handle_nudge(
    client: &MentorClient,
    config: &Config,
    age_days: Option<u32>,
    message: Option<String>,
    dry_run: bool,
    output: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let age_days = age_days.unwrap_or(config.discussions.age_days);
    let stale = client
        .find_stale(
            DiscussionStatus::AwaitingStudent,
            age_days,
            DiscussionOrder::Oldest,
        )
        .await?;
    let partition = client.partition(&stale).await?;

    match output {
        OutputFormat::Json => print_json(&partition)?,
        OutputFormat::Table => {
            println!("Conversations to finish: {}", partition.to_finish.len());
            println!("Conversations to nudge: {}", partition.to_nudge.len());
            if dry_run {
                print_rows(partition_rows(&partition), output, "Nothing to do.")?;
            }
        }
    }

    if dry_run {
        println!("{}", console::style("Dry run, no changes made.").yellow());
        return Ok(());
    }

    let message = message.or_else(|| config.discussions.nudge_message.clone());
    client.finish_discussions(&partition.to_finish).await?;
    client
        .nudge_discussions(&partition.to_nudge, message.as_deref())
        .await?;
    Ok(())
}
