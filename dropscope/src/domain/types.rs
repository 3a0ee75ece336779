//! Newtype wrappers for the identifiers that flow through the drop pipeline

use std::fmt;

/// Network namespace identifier (the namespace's inode number)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NetnsId(pub u32);

impl NetnsId {
    /// Parse the inode out of a `/proc/<pid>/ns/net` link target (`net:[4026531840]`)
    #[must_use]
    pub fn from_ns_link(target: &str) -> Option<Self> {
        target
            .strip_prefix("net:[")
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(|inode| inode.parse().ok())
            .map(Self)
    }
}

impl fmt::Display for NetnsId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netns_from_ns_link() {
        assert_eq!(NetnsId::from_ns_link("net:[4026531840]"), Some(NetnsId(4_026_531_840)));
        assert_eq!(NetnsId::from_ns_link("mnt:[4026531840]"), None);
        assert_eq!(NetnsId::from_ns_link("net:[abc]"), None);
        assert_eq!(NetnsId::from_ns_link("net:[4026531840"), None);
    }
}
