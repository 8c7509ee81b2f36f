//! Plain text notification emails through the local mail relay

use anyhow::{Context, Result};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::{Message, SmtpTransport, Transport};
use log::info;

pub const SENDER: &str = "isabella@isabella";
pub const SUBJECT: &str = "Isabella processing";

pub trait Notifier {
    /// Send `text` to a comma separated list of recipients
    fn send(&self, recipients: &str, subject: &str, text: &str) -> Result<()>;
}

/// Unauthenticated SMTP to a relay on the cluster, usually `localhost`
pub struct SmtpNotifier {
    pub server: String,
}

impl Notifier for SmtpNotifier {
    fn send(&self, recipients: &str, subject: &str, text: &str) -> Result<()> {
        let message = build_message(recipients, subject, text)?;
        info!("Sending '{subject}' to {recipients} via {}", self.server);
        let transport = SmtpTransport::builder_dangerous(&self.server).build();
        transport
            .send(&message)
            .with_context(|| format!("Can't send email via {}", self.server))?;
        Ok(())
    }
}

pub fn split_recipients(recipients: &str) -> impl Iterator<Item = &str> {
    recipients.split(',').map(str::trim).filter(|r| !r.is_empty())
}

fn build_message(recipients: &str, subject: &str, text: &str) -> Result<Message> {
    let mut builder = Message::builder()
        .from(SENDER.parse::<Mailbox>()?)
        .subject(subject);
    for recipient in split_recipients(recipients) {
        let mailbox: Mailbox = recipient
            .parse()
            .with_context(|| format!("Invalid email address {recipient}"))?;
        builder = builder.to(mailbox);
    }
    Ok(builder.header(ContentType::TEXT_PLAIN).body(text.to_string())?)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Keeps sent messages instead of sending them
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub sent: Mutex<Vec<(String, String, String)>>,
    }

    impl RecordingNotifier {
        pub(crate) fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    impl Notifier for RecordingNotifier {
        fn send(&self, recipients: &str, subject: &str, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((recipients.to_string(), subject.to_string(), text.to_string()));
            Ok(())
        }
    }

    #[test]
    fn recipients_are_split_on_commas() {
        let list: Vec<_> = split_recipients("a@srce.hr, b@pmf.hr,,").collect();
        assert_eq!(list, ["a@srce.hr", "b@pmf.hr"]);
    }

    #[test]
    fn message_has_every_recipient() {
        let message = build_message("a@srce.hr,b@pmf.hr", SUBJECT, "done").unwrap();
        let to: Vec<_> = message.envelope().to().iter().map(|a| a.to_string()).collect();
        assert_eq!(to, ["a@srce.hr", "b@pmf.hr"]);
    }

    #[test]
    fn bad_address_is_an_error() {
        assert!(build_message("not an address", SUBJECT, "done").is_err());
    }
}
