//! Role permissions as a bitmask.
//!
//! Each flag is a distinct power of two, so any subset is stored as the
//! bitwise OR of its members in a single integer column on the role.
//!
//! | entity | View | Add | Edit | Delete |
//! |--------|------|-----|------|--------|
//! | User   | 1    | 2   | 4    | 8      |
//! | Role   | 16   | 32  | 64   | 128    |
//! | FAQ    | 256  | 512 | 1024 | 2048   |
//! | CMS    | 4096 | 8192| 16384| 32768  |
//!
//! Decoding keeps only known flags; any other bit is dropped silently and is
//! therefore not round-tripped.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// A set of back-office permissions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub struct Permissions: u32 {
        const VIEW_USER   = 1 << 0;
        const ADD_USER    = 1 << 1;
        const EDIT_USER   = 1 << 2;
        const DELETE_USER = 1 << 3;

        const VIEW_ROLE   = 1 << 4;
        const ADD_ROLE    = 1 << 5;
        const EDIT_ROLE   = 1 << 6;
        const DELETE_ROLE = 1 << 7;

        const VIEW_FAQ    = 1 << 8;
        const ADD_FAQ     = 1 << 9;
        const EDIT_FAQ    = 1 << 10;
        const DELETE_FAQ  = 1 << 11;

        const VIEW_CMS    = 1 << 12;
        const ADD_CMS     = 1 << 13;
        const EDIT_CMS    = 1 << 14;
        const DELETE_CMS  = 1 << 15;
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::empty()
    }
}

impl Permissions {
    /// OR together every flag of the set. The empty set encodes to 0.
    pub fn encode<I>(flags: I) -> i64
    where
        I: IntoIterator<Item = Permissions>,
    {
        flags
            .into_iter()
            .fold(Permissions::empty(), |acc, flag| acc | flag)
            .mask()
    }

    /// Recover the set of known flags contained in `value`.
    ///
    /// Bits outside the known flags (including anything above bit 31) are ignored.
    pub fn decode(value: i64) -> Self {
        // Truncation to the low 32 bits only drops bits that are unknown anyway.
        Self::from_bits_truncate(value as u32)
    }

    /// Stored integer form.
    pub fn mask(self) -> i64 {
        i64::from(self.bits())
    }

    /// Member flag values, ascending (the array form used on write).
    pub fn values(self) -> Vec<i64> {
        self.iter().map(Permissions::mask).collect()
    }

    /// Member flag names (e.g. `VIEW_USER`), ascending by bit.
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| name).collect()
    }
}

impl core::fmt::Display for Permissions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.names().join(" | "))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire representation
// ─────────────────────────────────────────────────────────────────────────────

/// Permissions as accepted from clients: a plain mask or an array of flag values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PermissionsInput {
    Mask(i64),
    Values(Vec<i64>),
}

impl From<PermissionsInput> for Permissions {
    fn from(input: PermissionsInput) -> Self {
        match input {
            PermissionsInput::Mask(mask) => Permissions::decode(mask),
            PermissionsInput::Values(values) => values
                .into_iter()
                .fold(Permissions::empty(), |acc, v| acc | Permissions::decode(v)),
        }
    }
}

impl Serialize for Permissions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.mask())
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        PermissionsInput::deserialize(deserializer).map(Permissions::from)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Presentation grouping
// ─────────────────────────────────────────────────────────────────────────────

/// One selectable permission in the role editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionOption {
    pub key: &'static str,
    pub label: &'static str,
    pub value: Permissions,
}

/// Permissions of one entity, grouped for display.
///
/// Grouping is presentation only; it has no effect on encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionGroup {
    pub key: &'static str,
    pub label: &'static str,
    pub items: [PermissionOption; 4],
}

const fn crud_group(
    key: &'static str,
    label: &'static str,
    keys: [&'static str; 4],
    flags: [Permissions; 4],
) -> PermissionGroup {
    PermissionGroup {
        key,
        label,
        items: [
            PermissionOption { key: keys[0], label: "List", value: flags[0] },
            PermissionOption { key: keys[1], label: "Add", value: flags[1] },
            PermissionOption { key: keys[2], label: "Edit", value: flags[2] },
            PermissionOption { key: keys[3], label: "Delete", value: flags[3] },
        ],
    }
}

pub const PERMISSION_GROUPS: [PermissionGroup; 4] = [
    crud_group(
        "user",
        "User",
        ["ViewUser", "AddUser", "EditUser", "DeleteUser"],
        [
            Permissions::VIEW_USER,
            Permissions::ADD_USER,
            Permissions::EDIT_USER,
            Permissions::DELETE_USER,
        ],
    ),
    crud_group(
        "role",
        "Role",
        ["ViewRole", "AddRole", "EditRole", "DeleteRole"],
        [
            Permissions::VIEW_ROLE,
            Permissions::ADD_ROLE,
            Permissions::EDIT_ROLE,
            Permissions::DELETE_ROLE,
        ],
    ),
    crud_group(
        "faq",
        "FAQ",
        ["ViewFaq", "AddFaq", "EditFaq", "DeleteFaq"],
        [
            Permissions::VIEW_FAQ,
            Permissions::ADD_FAQ,
            Permissions::EDIT_FAQ,
            Permissions::DELETE_FAQ,
        ],
    ),
    crud_group(
        "cms",
        "CMS Management",
        ["ViewCms", "AddCms", "EditCms", "DeleteCms"],
        [
            Permissions::VIEW_CMS,
            Permissions::ADD_CMS,
            Permissions::EDIT_CMS,
            Permissions::DELETE_CMS,
        ],
    ),
];

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn encode_view_and_add_user_is_three() {
        let mask = Permissions::encode([Permissions::VIEW_USER, Permissions::ADD_USER]);
        assert_eq!(mask, 3);
        assert_eq!(
            Permissions::decode(3),
            Permissions::VIEW_USER | Permissions::ADD_USER
        );
    }

    #[test]
    fn empty_set_is_zero_both_ways() {
        assert_eq!(Permissions::encode(std::iter::empty()), 0);
        assert!(Permissions::decode(0).is_empty());
    }

    #[test]
    fn unknown_bits_are_dropped() {
        assert!(Permissions::decode(1 << 20).is_empty());
        assert_eq!(Permissions::decode((1 << 20) | 16), Permissions::VIEW_ROLE);
        assert!(Permissions::decode(1 << 40).is_empty());
    }

    #[test]
    fn every_flag_is_a_distinct_power_of_two() {
        let bits: Vec<u32> = Permissions::all().iter().map(|f| f.bits()).collect();
        assert_eq!(bits.len(), 16);
        assert!(bits.iter().all(|b| b.is_power_of_two()));
        let distinct: BTreeSet<u32> = bits.iter().copied().collect();
        assert_eq!(distinct.len(), 16);
    }

    #[test]
    fn groups_cover_every_flag_once() {
        let mut seen = Permissions::empty();
        for group in PERMISSION_GROUPS {
            for item in group.items {
                assert!(!seen.intersects(item.value), "{} listed twice", item.key);
                seen |= item.value;
            }
        }
        assert_eq!(seen, Permissions::all());
    }

    #[test]
    fn mask_and_array_inputs_agree() {
        let from_mask: Permissions = serde_json::from_str("3").unwrap();
        let from_array: Permissions = serde_json::from_str("[1, 2]").unwrap();
        assert_eq!(from_mask, from_array);
        assert_eq!(serde_json::to_value(from_mask).unwrap(), serde_json::json!(3));
    }

    #[test]
    fn array_input_drops_unknown_values() {
        let perms: Permissions = serde_json::from_str("[4, 1048576]").unwrap();
        assert_eq!(perms, Permissions::EDIT_USER);
    }

    #[test]
    fn values_lists_members_ascending() {
        let perms = Permissions::DELETE_CMS | Permissions::VIEW_USER | Permissions::ADD_FAQ;
        assert_eq!(perms.values(), vec![1, 512, 32768]);
        assert_eq!(perms.names(), vec!["VIEW_USER", "ADD_FAQ", "DELETE_CMS"]);
    }

    proptest! {
        /// Property: decode(encode(S)) == S for every subset of the known flags.
        #[test]
        fn decode_inverts_encode(bits in any::<u16>()) {
            let set = Permissions::from_bits_truncate(u32::from(bits));
            let members: Vec<Permissions> = set.iter().collect();

            prop_assert_eq!(Permissions::decode(Permissions::encode(members.iter().copied())), set);
            prop_assert_eq!(Permissions::encode(members.into_iter().rev()), set.mask());
        }

        /// Property: extra bits never introduce a flag.
        #[test]
        fn decode_never_invents_flags(value in any::<i64>()) {
            let decoded = Permissions::decode(value);
            prop_assert_eq!(decoded.mask() & !value, 0);
            prop_assert!(Permissions::all().contains(decoded));
        }
    }
}
