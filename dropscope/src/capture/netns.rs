//! Network namespace configuration for the kernel-side program
//!
//! The eBPF program tags each drop with `skb->dev->nd_net.net->ns.inum`. aya
//! programs have no CO-RE relocations, so the field offsets are resolved here
//! from the running kernel's BTF and pushed into the `CONFIG` map.
//!
//! When an offset can't be resolved (e.g. a kernel built without network
//! namespaces, where `possible_net_t` is empty) the program falls back to the
//! init namespace inode.

use btf_rs::{Btf, Type};
use dropscope_common::{
    CONFIG_INIT_NETNS, CONFIG_NETNS_FILTER, CONFIG_NETNS_OFFSETS_VALID, CONFIG_OFF_DEV_NET,
    CONFIG_OFF_NET_NS, CONFIG_OFF_NS_INUM, CONFIG_OFF_SKB_DEV,
};
use log::{info, warn};
use std::fs;
use std::path::Path;

use crate::domain::{CaptureError, NetnsId};

/// Kernel BTF location
pub const VMLINUX_BTF_PATH: &str = "/sys/kernel/btf/vmlinux";

/// Namespace link of PID 1, which lives in the init network namespace
const INIT_NETNS_LINK: &str = "/proc/1/ns/net";

/// Byte offsets needed to walk from an `sk_buff` to its namespace inode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetnsOffsets {
    /// `sk_buff.dev`
    pub skb_dev: u64,
    /// `net_device.nd_net.net`
    pub dev_net: u64,
    /// `net.ns`
    pub net_ns: u64,
    /// `ns_common.inum`
    pub ns_inum: u64,
}

impl NetnsOffsets {
    /// Resolve the offsets from a BTF file
    ///
    /// # Errors
    /// Returns an error if the BTF can't be parsed or a type/member is missing
    pub fn from_btf<P: AsRef<Path>>(path: P) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CaptureError::BtfUnavailable(path.to_path_buf()));
        }
        let btf = Btf::from_file(path).map_err(btf_err)?;

        Ok(Self {
            skb_dev: offset_of(&btf, "sk_buff", &["dev"])?,
            dev_net: offset_of(&btf, "net_device", &["nd_net", "net"])?,
            net_ns: offset_of(&btf, "net", &["ns"])?,
            ns_inum: offset_of(&btf, "ns_common", &["inum"])?,
        })
    }
}

/// Everything userspace writes into the `CONFIG` map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetnsConfig {
    /// Only report drops from this namespace inode; `None` reports all
    pub filter: Option<u64>,
    pub init_netns: NetnsId,
    pub offsets: Option<NetnsOffsets>,
}

impl NetnsConfig {
    /// Gather the namespace configuration from the running system
    ///
    /// Missing BTF members are not fatal: the offsets are left out and the
    /// eBPF program reports the init namespace instead.
    ///
    /// # Errors
    /// Returns an error if the init namespace inode can't be read
    pub fn detect(filter: Option<u64>) -> Result<Self, CaptureError> {
        let init_netns = init_netns()?;

        let offsets = match NetnsOffsets::from_btf(VMLINUX_BTF_PATH) {
            Ok(offsets) => {
                info!("Resolved namespace offsets from BTF: {offsets:?}");
                Some(offsets)
            }
            Err(e) => {
                warn!("Namespace offsets unavailable ({e}); drops will be tagged {init_netns}");
                None
            }
        };

        Ok(Self { filter, init_netns, offsets })
    }

    /// `(key, value)` pairs for the `CONFIG` map
    #[must_use]
    pub fn map_entries(&self) -> Vec<(u32, u64)> {
        let mut entries = vec![
            (CONFIG_INIT_NETNS, u64::from(self.init_netns.0)),
            (CONFIG_NETNS_FILTER, self.filter.unwrap_or(0)),
        ];

        match self.offsets {
            Some(off) => entries.extend([
                (CONFIG_OFF_SKB_DEV, off.skb_dev),
                (CONFIG_OFF_DEV_NET, off.dev_net),
                (CONFIG_OFF_NET_NS, off.net_ns),
                (CONFIG_OFF_NS_INUM, off.ns_inum),
                (CONFIG_NETNS_OFFSETS_VALID, 1),
            ]),
            None => entries.push((CONFIG_NETNS_OFFSETS_VALID, 0)),
        }

        entries
    }
}

/// Inode of the init network namespace
///
/// # Errors
/// Returns an error if `/proc/1/ns/net` can't be read or parsed
pub fn init_netns() -> Result<NetnsId, CaptureError> {
    let target = fs::read_link(INIT_NETNS_LINK)?;
    let target = target.to_string_lossy();
    NetnsId::from_ns_link(&target)
        .ok_or_else(|| CaptureError::InitNetns(format!("unexpected link target {target}")))
}

fn btf_err(e: impl std::fmt::Display) -> CaptureError {
    CaptureError::Btf(e.to_string())
}

/// Byte offset of a (possibly nested) member path inside a named struct
fn offset_of(btf: &Btf, type_name: &str, path: &[&str]) -> Result<u64, CaptureError> {
    let mut current = btf
        .resolve_types_by_name(type_name)
        .map_err(|_| CaptureError::TypeNotFound(type_name.to_string()))?
        .into_iter()
        .find(|t| matches!(t, Type::Struct(_)))
        .ok_or_else(|| CaptureError::TypeNotFound(type_name.to_string()))?;

    let mut bits = 0u64;
    for member in path {
        let (member_bits, member_type) = find_member(btf, &current, member)?.ok_or_else(|| {
            CaptureError::MemberNotFound {
                r#type: type_name.to_string(),
                member: (*member).to_string(),
            }
        })?;
        bits += u64::from(member_bits);
        current = strip_modifiers(btf, member_type)?;
    }

    if bits % 8 != 0 {
        return Err(CaptureError::BitfieldMember {
            r#type: type_name.to_string(),
            member: path.join("."),
        });
    }

    Ok(bits / 8)
}

/// Find `name` in a struct or union, descending into anonymous members
///
/// Returns the member's bit offset relative to `container` and its type.
fn find_member(
    btf: &Btf,
    container: &Type,
    name: &str,
) -> Result<Option<(u32, Type)>, CaptureError> {
    let members = match container {
        Type::Struct(s) => &s.members,
        Type::Union(u) => &u.members,
        _ => return Ok(None),
    };

    for member in members {
        let member_name = btf.resolve_name(member).map_err(btf_err)?;

        if member_name == name {
            if matches!(member.bitfield_size(), Some(size) if size != 0) {
                return Err(CaptureError::BitfieldMember {
                    r#type: "<anonymous>".to_string(),
                    member: name.to_string(),
                });
            }
            let member_type = btf.resolve_chained_type(member).map_err(btf_err)?;
            return Ok(Some((member.bit_offset(), member_type)));
        }

        if member_name.is_empty() {
            let inner = strip_modifiers(btf, btf.resolve_chained_type(member).map_err(btf_err)?)?;
            if let Some((inner_bits, found)) = find_member(btf, &inner, name)? {
                return Ok(Some((member.bit_offset() + inner_bits, found)));
            }
        }
    }

    Ok(None)
}

/// Follow typedef/const/volatile links down to the underlying type
fn strip_modifiers(btf: &Btf, mut r#type: Type) -> Result<Type, CaptureError> {
    loop {
        r#type = match r#type {
            Type::Typedef(t) => btf.resolve_chained_type(&t).map_err(btf_err)?,
            Type::Const(t) => btf.resolve_chained_type(&t).map_err(btf_err)?,
            Type::Volatile(t) => btf.resolve_chained_type(&t).map_err(btf_err)?,
            other => return Ok(other),
        };
    }
}
