use crate::{
    capability::Capability,
    identity::Identity,
    options::options,
    render,
    string_buffer::StringBuffer,
    types::FileType,
};
use nix::{libc, sys::stat::FileStat};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Class {
    Owner,
    Group,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Wanted {
    Read,
    Write,
    Execute,
    Search,
}

impl Wanted {
    fn bit(self) -> u32 {
        match self {
            Wanted::Read => 4,
            Wanted::Write => 2,
            Wanted::Execute | Wanted::Search => 1,
        }
    }
}

// exactly one class decides, a looser group or other class never rescues a denied owner
fn deciding_class(st: &FileStat, id: &Identity) -> (Class, u32) {
    let mode = st.st_mode;
    if id.uid == st.st_uid {
        (Class::Owner, (mode >> 6) & 7)
    } else if id.in_group(st.st_gid) {
        (Class::Group, (mode >> 3) & 7)
    } else {
        (Class::Other, mode & 7)
    }
}

fn file_type(st: &FileStat) -> FileType {
    FileType::from_mode(st.st_mode)
}

/// The capability that would bypass the mode bits, if it is held.
fn bypass(st: &FileStat, id: &Identity, wanted: Wanted) -> Option<Capability> {
    match wanted {
        Wanted::Read | Wanted::Search => [Capability::DacOverride, Capability::DacReadSearch]
            .into_iter()
            .find(|capability| id.has(*capability)),
        Wanted::Write => id
            .has(Capability::DacOverride)
            .then_some(Capability::DacOverride),
        // root may only execute what somebody may execute
        Wanted::Execute => (id.has(Capability::DacOverride) && st.st_mode & 0o111 != 0)
            .then_some(Capability::DacOverride),
    }
}

fn applicable(st: &FileStat, wanted: Wanted) -> bool {
    match wanted {
        Wanted::Execute => file_type(st) == FileType::Regular,
        Wanted::Search => file_type(st) == FileType::Directory,
        Wanted::Read | Wanted::Write => true,
    }
}

fn have(st: &FileStat, id: &Identity, wanted: Wanted) -> bool {
    if !applicable(st, wanted) {
        return false;
    }
    if bypass(st, id, wanted).is_some() {
        return true;
    }
    deciding_class(st, id).1 & wanted.bit() != 0
}

pub fn have_read_permission(st: &FileStat, id: &Identity) -> bool {
    have(st, id, Wanted::Read)
}

pub fn have_write_permission(st: &FileStat, id: &Identity) -> bool {
    have(st, id, Wanted::Write)
}

pub fn have_execute_permission(st: &FileStat, id: &Identity) -> bool {
    have(st, id, Wanted::Execute)
}

pub fn have_search_permission(st: &FileStat, id: &Identity) -> bool {
    have(st, id, Wanted::Search)
}

/// Permission to change the inode itself (chmod, utime, ...).
pub fn have_inode_permission(st: &FileStat, id: &Identity) -> bool {
    id.has(Capability::Fowner) || id.uid == st.st_uid
}

pub fn explain_read_permission(sb: &mut StringBuffer, st: &FileStat, id: &Identity) -> bool {
    explain(sb, st, id, Wanted::Read)
}

pub fn explain_write_permission(sb: &mut StringBuffer, st: &FileStat, id: &Identity) -> bool {
    explain(sb, st, id, Wanted::Write)
}

pub fn explain_execute_permission(sb: &mut StringBuffer, st: &FileStat, id: &Identity) -> bool {
    explain(sb, st, id, Wanted::Execute)
}

pub fn explain_search_permission(sb: &mut StringBuffer, st: &FileStat, id: &Identity) -> bool {
    explain(sb, st, id, Wanted::Search)
}

/// Narrates why the inode may not be modified, returns the same answer as
/// [`have_inode_permission`].
pub fn explain_inode_permission(sb: &mut StringBuffer, st: &FileStat, id: &Identity) -> bool {
    if have_inode_permission(st, id) {
        return true;
    }
    sb.printf(format_args!(", the process {} ", id.uid_caption()));
    render::uid(sb, id.uid);
    sb.printf(format_args!(" does not match the {} owner UID ", file_type(st)));
    render::uid(sb, st.st_uid);
    if options().dialect_specific {
        sb.printf(format_args!(
            ", and the process does not have the {} capability",
            Capability::Fowner
        ));
    }
    false
}

fn explain(sb: &mut StringBuffer, st: &FileStat, id: &Identity, wanted: Wanted) -> bool {
    if !applicable(st, wanted) {
        return false;
    }
    if let Some(capability) = bypass(st, id, wanted) {
        if options().dialect_specific {
            sb.printf(format_args!(", the process has the {capability} capability"));
        }
        return true;
    }
    let kind = file_type(st);
    let (class, bits) = deciding_class(st, id);
    let owner_bits = (st.st_mode >> 6) & 7;
    let group_bits = (st.st_mode >> 3) & 7;
    let other_bits = st.st_mode & 7;

    sb.printf(format_args!(", the process {} ", id.uid_caption()));
    render::uid(sb, id.uid);
    if class == Class::Owner {
        sb.printf(format_args!(" matches the {kind} owner UID "));
        render::uid(sb, st.st_uid);
        sb.printf(format_args!(
            " and the owner permission mode is \"{}\", so the group and others permission modes are ignored",
            render::rwx(owner_bits)
        ));
    } else {
        sb.printf(format_args!(" does not match the {kind} owner UID "));
        render::uid(sb, st.st_uid);
        sb.printf(format_args!(
            " so the owner permission mode \"{}\" is ignored",
            render::rwx(owner_bits)
        ));
        if class == Class::Group {
            if id.gid == st.st_gid {
                sb.printf(format_args!(", the process {} ", id.gid_caption()));
                render::gid(sb, id.gid);
            } else {
                sb.puts(", the process supplementary group ");
                render::gid(sb, st.st_gid);
            }
            sb.printf(format_args!(" matches the {kind} group GID "));
            render::gid(sb, st.st_gid);
            sb.printf(format_args!(
                " and the group permission mode is \"{}\", so the others permission mode is ignored",
                render::rwx(group_bits)
            ));
        } else {
            sb.printf(format_args!(", the process {} ", id.gid_caption()));
            render::gid(sb, id.gid);
            sb.printf(format_args!(" does not match the {kind} group GID "));
            render::gid(sb, st.st_gid);
            sb.printf(format_args!(
                " so the group permission mode \"{}\" is ignored, the permission mode for others is \"{}\"",
                render::rwx(group_bits),
                render::rwx(other_bits)
            ));
        }
    }

    let granted = bits & wanted.bit() != 0;
    if !granted && options().dialect_specific {
        let capability = match wanted {
            Wanted::Read | Wanted::Search => Capability::DacReadSearch,
            Wanted::Write | Wanted::Execute => Capability::DacOverride,
        };
        sb.printf(format_args!(
            ", and the process does not have the {capability} capability"
        ));
    }
    granted
}

/// Whether `st` is a directory with the sticky bit that stops `id` removing
/// the entry for `victim`.
pub fn sticky_denies_unlink(dir: &FileStat, victim: &FileStat, id: &Identity) -> bool {
    dir.st_mode & libc::S_ISVTX != 0
        && !id.has(Capability::Fowner)
        && id.uid != victim.st_uid
        && id.uid != dir.st_uid
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::capability::CapabilitySet;

    pub(crate) fn stat_with(mode: u32, uid: u32, gid: u32) -> FileStat {
        let mut st: FileStat = unsafe { std::mem::zeroed() };
        st.st_mode = mode;
        st.st_uid = uid;
        st.st_gid = gid;
        st
    }

    #[test]
    fn owner_rule_takes_precedence() {
        // owner may not read, group and others may
        let st = stat_with(libc::S_IFREG | 0o244, 1000, 100);
        let id = Identity::new(1000, 100);
        assert!(!have_read_permission(&st, &id));
        let mut sb = StringBuffer::default();
        assert!(!explain_read_permission(&mut sb, &st, &id));
        assert!(sb.as_str().contains("owner permission mode is \"-w-\""), "{sb}");
    }

    #[test]
    fn group_rule_applies_when_not_owner() {
        let st = stat_with(libc::S_IFREG | 0o604, 0, 100);
        let id = Identity::new(1000, 100);
        assert!(!have_read_permission(&st, &id));
        let id = Identity::new(1000, 5).with_groups(vec![100]);
        assert!(!have_read_permission(&st, &id));
        let st = stat_with(libc::S_IFREG | 0o040, 0, 100);
        assert!(have_read_permission(&st, &id));
    }

    #[test]
    fn other_rule_applies_to_strangers() {
        let st = stat_with(libc::S_IFREG | 0o004, 0, 0);
        let id = Identity::new(1000, 1000);
        assert!(have_read_permission(&st, &id));
        assert!(!have_write_permission(&st, &id));
    }

    #[test]
    fn capabilities_short_circuit() {
        let st = stat_with(libc::S_IFREG, 0, 0);
        let id = Identity::new(1000, 1000)
            .with_capabilities(CapabilitySet::EMPTY.with(Capability::DacOverride));
        assert!(have_write_permission(&st, &id));
        // execute needs at least one x bit even with the capability
        assert!(!have_execute_permission(&st, &id));
        let st = stat_with(libc::S_IFREG | 0o001, 0, 0);
        assert!(have_execute_permission(&st, &id));

        let id = Identity::new(1000, 1000)
            .with_capabilities(CapabilitySet::EMPTY.with(Capability::DacReadSearch));
        let dir = stat_with(libc::S_IFDIR, 0, 0);
        assert!(have_search_permission(&dir, &id));
        assert!(!have_write_permission(&dir, &id));
    }

    #[test]
    fn execute_and_search_need_the_right_type() {
        let id = Identity::new(0, 0).with_capabilities(CapabilitySet::all());
        let dir = stat_with(libc::S_IFDIR | 0o777, 0, 0);
        assert!(!have_execute_permission(&dir, &id));
        let file = stat_with(libc::S_IFREG | 0o777, 0, 0);
        assert!(!have_search_permission(&file, &id));
    }

    #[test]
    fn inode_permission_needs_ownership_or_fowner() {
        let st = stat_with(libc::S_IFREG | 0o777, 0, 0);
        assert!(!have_inode_permission(&st, &Identity::new(1000, 1000)));
        assert!(have_inode_permission(&st, &Identity::new(0, 0)));
        let fowner = Identity::new(1000, 1000)
            .with_capabilities(CapabilitySet::EMPTY.with(Capability::Fowner));
        assert!(have_inode_permission(&st, &fowner));
    }

    #[test]
    fn sticky_directories() {
        let dir = stat_with(libc::S_IFDIR | libc::S_ISVTX | 0o777, 0, 0);
        let victim = stat_with(libc::S_IFREG | 0o644, 2000, 2000);
        assert!(sticky_denies_unlink(&dir, &victim, &Identity::new(1000, 1000)));
        assert!(!sticky_denies_unlink(&dir, &victim, &Identity::new(2000, 2000)));
    }
}
