use crate::capability::{Capability, CapabilitySet};
use nix::unistd::{getegid, geteuid, getgid, getgroups, getuid};
use std::sync::{LazyLock, Mutex};
use uzers::{Groups, Users};

pub static UZERS_CACHE: LazyLock<Mutex<uzers::UsersCache>> =
    LazyLock::new(|| Mutex::new(uzers::UsersCache::new()));

/// Which of the process ids an [`Identity`] was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdKind {
    Effective,
    Real,
}

/// The credentials permission checks are made against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
    pub groups: Vec<u32>,
    pub capabilities: CapabilitySet,
    pub kind: IdKind,
}

impl Default for Identity {
    fn default() -> Self {
        Identity::current()
    }
}

impl Identity {
    /// A bare identity: no supplementary groups, no capabilities.
    pub fn new(uid: u32, gid: u32) -> Identity {
        Identity {
            uid,
            gid,
            groups: Vec::new(),
            capabilities: CapabilitySet::EMPTY,
            kind: IdKind::Effective,
        }
    }

    pub fn current() -> Identity {
        Identity {
            uid: geteuid().as_raw(),
            gid: getegid().as_raw(),
            groups: supplementary_groups(),
            capabilities: CapabilitySet::current(),
            kind: IdKind::Effective,
        }
    }

    /// The real ids, as access(2) checks them.
    pub fn real() -> Identity {
        let uid = getuid();
        Identity {
            uid: uid.as_raw(),
            gid: getgid().as_raw(),
            groups: supplementary_groups(),
            capabilities: if uid.is_root() {
                CapabilitySet::all()
            } else {
                CapabilitySet::EMPTY
            },
            kind: IdKind::Real,
        }
    }

    pub fn with_groups(mut self, groups: Vec<u32>) -> Identity {
        self.groups = groups;
        self
    }

    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Identity {
        self.capabilities = capabilities;
        self
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn in_group(&self, gid: u32) -> bool {
        self.gid == gid || self.groups.contains(&gid)
    }

    pub fn uid_caption(&self) -> &'static str {
        match self.kind {
            IdKind::Effective => "effective UID",
            IdKind::Real => "real UID",
        }
    }

    pub fn gid_caption(&self) -> &'static str {
        match self.kind {
            IdKind::Effective => "effective GID",
            IdKind::Real => "real GID",
        }
    }
}

fn supplementary_groups() -> Vec<u32> {
    getgroups()
        .map(|groups| groups.into_iter().map(|gid| gid.as_raw()).collect())
        .unwrap_or_default()
}

pub fn user_name(uid: u32) -> Option<String> {
    let cache = UZERS_CACHE.lock().ok()?;
    let user = cache.get_user_by_uid(uid)?;
    Some(user.name().to_str()?.to_owned())
}

pub fn group_name(gid: u32) -> Option<String> {
    let cache = UZERS_CACHE.lock().ok()?;
    let group = cache.get_group_by_gid(gid)?;
    Some(group.name().to_str()?.to_owned())
}

pub fn user_id(name: &str) -> Option<u32> {
    let cache = UZERS_CACHE.lock().ok()?;
    cache.get_user_by_name(name).map(|user| user.uid())
}

pub fn group_id(name: &str) -> Option<u32> {
    let cache = UZERS_CACHE.lock().ok()?;
    cache.get_group_by_name(name).map(|group| group.gid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_identity_has_nothing_extra() {
        let id = Identity::new(1000, 100);
        assert!(id.in_group(100));
        assert!(!id.in_group(10));
        assert!(!id.has(Capability::DacOverride));
        assert_eq!(id.uid_caption(), "effective UID");
    }

    #[test]
    fn supplementary_groups_count() {
        let id = Identity::new(1000, 100).with_groups(vec![10, 20]);
        assert!(id.in_group(20));
    }

    #[test]
    fn current_matches_process() {
        let id = Identity::current();
        assert_eq!(id.uid, geteuid().as_raw());
        assert_eq!(Identity::real().kind, IdKind::Real);
    }

    #[test]
    fn root_has_a_name() {
        assert_eq!(user_name(0).as_deref(), Some("root"));
    }
}
