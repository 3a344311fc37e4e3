use std::fmt;

use mess_types::{MessId, UserId};

/// Address of one record in the account store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    /// A user's account document (`users/{id}`).
    Account(UserId),
    /// A mess (vendor) document (`messes/{id}`).
    Vendor(MessId),
}

impl RecordKey {
    pub fn account(user_id: &UserId) -> Self {
        Self::Account(user_id.clone())
    }

    pub fn vendor(mess_id: &MessId) -> Self {
        Self::Vendor(mess_id.clone())
    }

    /// Name of the collection holding this record.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Account(_) => "users",
            Self::Vendor(_) => "messes",
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => write!(f, "{}/{id}", self.collection()),
            Self::Vendor(id) => write!(f, "{}/{id}", self.collection()),
        }
    }
}

/// A numeric field of an account that supports native increments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Wallet,
    Coupons(MessId),
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Wallet => f.write_str("wallet"),
            Self::Coupons(mess_id) => write!(f, "coupons.{mess_id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_as_document_paths() {
        let user = UserId::new("u1").unwrap();
        let mess = MessId::new("m1").unwrap();
        assert_eq!(RecordKey::account(&user).to_string(), "users/u1");
        assert_eq!(RecordKey::vendor(&mess).to_string(), "messes/m1");
    }

    #[test]
    fn fields_render_as_dotted_paths() {
        let mess = MessId::new("north").unwrap();
        assert_eq!(Field::Wallet.to_string(), "wallet");
        assert_eq!(Field::Coupons(mess).to_string(), "coupons.north");
    }
}
