//! Core types used throughout CryptoChat

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Server-assigned account identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    /// Create from a raw id
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw id
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for AccountId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Server-assigned message identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(i64);

impl MessageId {
    /// Create from a raw id
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Raw id
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// An account on the relay, either the local profile or a contact
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Assigned by the relay on registration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AccountId>,
    /// Display name
    pub name: String,
    /// SPKI PEM public key
    pub public_key: String,
    /// Phone number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Account {
    /// Id, or [`Error::MissingAccountId`] for an unconfirmed account
    pub fn require_id(&self) -> Result<AccountId> {
        self.id.ok_or(Error::MissingAccountId)
    }
}

/// A sealed message as stored by the relay
///
/// `message` is the base64 sealed envelope; plaintext is never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Assigned by the relay on send
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<MessageId>,
    /// Sender account
    pub sender_id: AccountId,
    /// Recipient account
    pub recipient_id: AccountId,
    /// Sealed ciphertext
    pub message: String,
}

impl Message {
    /// Create an outbound message without an id
    pub fn new(sender_id: AccountId, recipient_id: AccountId, ciphertext: impl Into<String>) -> Self {
        Self {
            message_id: None,
            sender_id,
            recipient_id,
            message: ciphertext.into(),
        }
    }

    /// Whether `id` is the sender or the recipient
    pub fn involves(&self, id: AccountId) -> bool {
        self.sender_id == id || self.recipient_id == id
    }

    /// The other endpoint as seen from `me`; `None` if `me` is not an endpoint
    pub fn counterpart(&self, me: AccountId) -> Option<AccountId> {
        if self.sender_id == me {
            Some(self.recipient_id)
        } else if self.recipient_id == me {
            Some(self.sender_id)
        } else {
            None
        }
    }

    /// Same message, comparing ids when both carry one
    pub fn same_as(&self, other: &Message) -> bool {
        match (self.message_id, other.message_id) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

/// Registration form for a new account
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NewAccount {
    /// Display name, required
    pub name: String,
    /// Digits, parentheses and dashes
    pub phone: Option<String>,
    /// `local@domain`
    pub email: Option<String>,
}

impl NewAccount {
    /// Create a form with just a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Set the email address
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Validate the form and build the account to register
    pub fn into_account(self, public_key_pem: impl Into<String>) -> Result<Account> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvalidAccount("name is required".to_string()));
        }

        let phone = non_empty(self.phone);
        if let Some(phone) = &phone {
            if !is_valid_phone(phone) {
                return Err(Error::InvalidAccount(format!("invalid phone number: {}", phone)));
            }
        }

        let email = non_empty(self.email);
        if let Some(email) = &email {
            if !is_valid_email(email) {
                return Err(Error::InvalidAccount(format!("invalid email: {}", email)));
            }
        }

        Ok(Account {
            id: None,
            name,
            public_key: public_key_pem.into(),
            phone,
            email,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn is_valid_phone(phone: &str) -> bool {
    phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '(' | ')' | '-'))
}

// Equivalent to `^(.+)@(.+)$` on a single line
fn is_valid_email(email: &str) -> bool {
    if email.contains('\n') {
        return false;
    }
    email
        .char_indices()
        .any(|(i, c)| c == '@' && i > 0 && i + 1 < email.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_json_field_names() {
        let account = Account {
            id: Some(AccountId::new(26)),
            name: "Will".to_string(),
            public_key: "PEM".to_string(),
            phone: None,
            email: Some("will@example.com".to_string()),
        };

        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["id"], 26);
        assert_eq!(json["publicKey"], "PEM");
        assert_eq!(json["email"], "will@example.com");
        assert!(json.get("phone").is_none());
    }

    #[test]
    fn test_unregistered_account_omits_id() {
        let account = NewAccount::new("Will").into_account("PEM").unwrap();
        let json = serde_json::to_string(&account).unwrap();
        assert_eq!(json, r#"{"name":"Will","publicKey":"PEM"}"#);
    }

    #[test]
    fn test_account_requires_name_and_key() {
        assert!(serde_json::from_str::<Account>(r#"{"id":1,"publicKey":"PEM"}"#).is_err());
        assert!(serde_json::from_str::<Account>(r#"{"id":1,"name":"Will"}"#).is_err());

        let account: Account = serde_json::from_str(r#"{"name":"Will","publicKey":"PEM"}"#).unwrap();
        assert!(matches!(account.require_id(), Err(Error::MissingAccountId)));
    }

    #[test]
    fn test_message_json_field_names() {
        let message: Message = serde_json::from_str(
            r#"{"messageId":7,"senderId":26,"recipientId":27,"message":"abc"}"#,
        )
        .unwrap();
        assert_eq!(message.message_id, Some(MessageId::new(7)));
        assert_eq!(message.sender_id, AccountId::new(26));
        assert_eq!(message.recipient_id, AccountId::new(27));

        let outbound = Message::new(AccountId::new(26), AccountId::new(27), "abc");
        assert_eq!(
            serde_json::to_string(&outbound).unwrap(),
            r#"{"senderId":26,"recipientId":27,"message":"abc"}"#
        );
    }

    #[test]
    fn test_counterpart() {
        let message = Message::new(AccountId::new(1), AccountId::new(2), "x");
        assert_eq!(message.counterpart(AccountId::new(1)), Some(AccountId::new(2)));
        assert_eq!(message.counterpart(AccountId::new(2)), Some(AccountId::new(1)));
        assert_eq!(message.counterpart(AccountId::new(3)), None);

        let to_self = Message::new(AccountId::new(1), AccountId::new(1), "x");
        assert_eq!(to_self.counterpart(AccountId::new(1)), Some(AccountId::new(1)));
    }

    #[test]
    fn test_same_as_prefers_ids() {
        let mut a = Message::new(AccountId::new(1), AccountId::new(2), "x");
        let mut b = a.clone();
        assert!(a.same_as(&b));

        a.message_id = Some(MessageId::new(1));
        b.message_id = Some(MessageId::new(2));
        assert!(!a.same_as(&b));

        b.message = "y".to_string();
        b.message_id = Some(MessageId::new(1));
        assert!(a.same_as(&b));
    }

    #[test]
    fn test_account_validation() {
        assert!(NewAccount::new("  ").into_account("PEM").is_err());

        let account = NewAccount::new(" Will ")
            .with_phone("(555)-123-4567")
            .with_email("will@example.com")
            .into_account("PEM")
            .unwrap();
        assert_eq!(account.name, "Will");
        assert_eq!(account.phone.as_deref(), Some("(555)-123-4567"));

        assert!(NewAccount::new("Will").with_phone("555 1234").into_account("PEM").is_err());
        assert!(NewAccount::new("Will").with_phone("+15551234").into_account("PEM").is_err());
        assert!(NewAccount::new("Will").with_email("will").into_account("PEM").is_err());
        assert!(NewAccount::new("Will").with_email("@example.com").into_account("PEM").is_err());
        assert!(NewAccount::new("Will").with_email("will@").into_account("PEM").is_err());
    }

    #[test]
    fn test_empty_optionals_are_absent() {
        let account = NewAccount::new("Will")
            .with_phone("")
            .with_email("   ")
            .into_account("PEM")
            .unwrap();
        assert_eq!(account.phone, None);
        assert_eq!(account.email, None);
    }

    #[test]
    fn test_account_id_parse() {
        assert_eq!("26".parse::<AccountId>().unwrap(), AccountId::new(26));
        assert!("abc".parse::<AccountId>().is_err());
        assert_eq!(AccountId::new(26).to_string(), "26");
    }
}
