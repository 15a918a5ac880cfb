// 📤 CSV export of the contacts table as currently filtered and sorted

use crate::entities::Contact;
use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

/// One flat CSV line; tags joined with "; "
#[derive(Debug, Serialize)]
struct ContactRow<'a> {
    id: u32,
    name: &'a str,
    email: &'a str,
    company: &'a str,
    phone: &'a str,
    status: &'static str,
    assigned_rep: &'a str,
    tags: String,
    created_at: String,
    last_contact: String,
}

impl<'a> From<&'a Contact> for ContactRow<'a> {
    fn from(contact: &'a Contact) -> Self {
        ContactRow {
            id: contact.id,
            name: &contact.name,
            email: &contact.email,
            company: &contact.company,
            phone: &contact.phone,
            status: contact.status.as_str(),
            assigned_rep: &contact.assigned_rep,
            tags: contact.tags.iter().collect::<Vec<_>>().join("; "),
            created_at: contact.created_at.to_rfc3339(),
            last_contact: contact.last_contact.to_rfc3339(),
        }
    }
}

pub fn write_contacts<W: Write>(contacts: &[Contact], writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    for contact in contacts {
        wtr.serialize(ContactRow::from(contact))
            .with_context(|| format!("Failed to write contact {}", contact.id))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(contacts.len())
}

pub fn write_contacts_file(contacts: &[Contact], path: &Path) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    write_contacts(contacts, file)
}
