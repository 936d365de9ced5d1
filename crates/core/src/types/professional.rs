//! Professional identity and revealed contact types.

use serde::{Deserialize, Serialize};

use super::id::ProfessionalId;

/// Minimal identity of the logged-in professional, as returned by the
/// backend `/api/auth/me` and `/api/auth/verify-otp` endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthProfessional {
    pub id: ProfessionalId,
    pub display_name: String,
    pub email: String,
    pub slug: String,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
}

/// A professional's private contact channels, disclosed after a visitor
/// redeems a contact-reveal challenge.
///
/// Every field is optional; professionals choose which channels to share.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfessionalContact {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub whatsapp: Option<String>,
}

/// Which channel a [`ContactLink`] opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    Email,
    Phone,
    WhatsApp,
}

impl ContactKind {
    /// Human-readable label for the channel.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::WhatsApp => "WhatsApp",
        }
    }

    /// Whether the link should open in a new browsing context.
    #[must_use]
    pub const fn is_external(self) -> bool {
        matches!(self, Self::WhatsApp)
    }
}

/// An actionable link for one contact channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactLink {
    pub kind: ContactKind,
    /// The value as the professional entered it.
    pub display: String,
    /// `mailto:`, `tel:`, or `https://wa.me/` target.
    pub href: String,
}

impl ProfessionalContact {
    /// Base URL for WhatsApp click-to-chat links.
    pub const WHATSAPP_BASE: &'static str = "https://wa.me/";

    /// Build the links to render, skipping absent or blank channels.
    ///
    /// An empty result means the caller must show an explicit
    /// "no contact details" placeholder.
    #[must_use]
    pub fn links(&self) -> Vec<ContactLink> {
        let mut links = Vec::with_capacity(3);

        if let Some(email) = present(self.email.as_deref()) {
            links.push(ContactLink {
                kind: ContactKind::Email,
                display: email.to_string(),
                href: format!("mailto:{email}"),
            });
        }

        if let Some(phone) = present(self.phone.as_deref()) {
            links.push(ContactLink {
                kind: ContactKind::Phone,
                display: phone.to_string(),
                href: format!("tel:{phone}"),
            });
        }

        if let Some(whatsapp) = present(self.whatsapp.as_deref()) {
            let digits = digits_only(whatsapp);
            if !digits.is_empty() {
                links.push(ContactLink {
                    kind: ContactKind::WhatsApp,
                    display: whatsapp.to_string(),
                    href: format!("{}{digits}", Self::WHATSAPP_BASE),
                });
            }
        }

        links
    }

    /// Whether no channel at all is available.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links().is_empty()
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Strip every non-digit from a phone number.
#[must_use]
pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_whatsapp_link_keeps_only_digits() {
        let contact = ProfessionalContact {
            whatsapp: Some("+1 (555) 123-4567".to_string()),
            ..Default::default()
        };

        let links = contact.links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].kind, ContactKind::WhatsApp);
        assert_eq!(links[0].href, "https://wa.me/15551234567");
        assert_eq!(links[0].display, "+1 (555) 123-4567");
    }

    #[test]
    fn test_all_channels_render_in_order() {
        let contact = ProfessionalContact {
            email: Some("pro@example.com".to_string()),
            phone: Some("+91 98765 43210".to_string()),
            whatsapp: Some("+91 98765 43210".to_string()),
        };

        let hrefs: Vec<_> = contact.links().into_iter().map(|l| l.href).collect();
        assert_eq!(
            hrefs,
            vec![
                "mailto:pro@example.com".to_string(),
                "tel:+91 98765 43210".to_string(),
                "https://wa.me/919876543210".to_string(),
            ]
        );
    }

    #[test]
    fn test_absent_and_blank_channels_are_empty() {
        let contact: ProfessionalContact =
            serde_json::from_str(r#"{"email":null,"phone":null,"whatsapp":null}"#).unwrap();
        assert!(contact.is_empty());

        let blank = ProfessionalContact {
            email: Some("  ".to_string()),
            whatsapp: Some("n/a".to_string()),
            ..Default::default()
        };
        assert!(blank.is_empty());
    }

    #[test]
    fn test_auth_professional_uses_camel_case() {
        let json = r#"{
            "id": 12,
            "displayName": "Asha Rao",
            "email": "asha@example.com",
            "slug": "asha-rao",
            "isAvailable": true,
            "isVerified": false,
            "headline": "Residential plumber"
        }"#;

        let pro: AuthProfessional = serde_json::from_str(json).unwrap();
        assert_eq!(pro.id, ProfessionalId::new(12));
        assert_eq!(pro.display_name, "Asha Rao");
        assert!(pro.is_available);
        assert_eq!(pro.avatar_url, None);
        assert_eq!(pro.headline.as_deref(), Some("Residential plumber"));
    }
}
