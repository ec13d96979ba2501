//! Incremental rebuild decisions.
//!
//! Objects are compared against their source and against every header the
//! compiler listed in the object's depfile (`-MD -MF`). Anything ambiguous,
//! like a missing depfile or a listed header that no longer exists, resolves
//! to "rebuild".

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A parsed make-style dependency rule: `target: dep dep ...`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Depfile {
    pub target: Option<String>,
    pub deps: Vec<String>,
}

/// Parse depfile text.
///
/// Tokens are whitespace separated. A backslash before a newline is a line
/// continuation; before any other character it makes that character part of
/// the current token (so `\ ` is a literal space). The first unescaped `:`
/// closes the target token and everything after it is a dependency.
pub fn parse_depfile(text: &str) -> Depfile {
    let mut out = Depfile::default();
    let mut token = String::new();
    let mut seen_colon = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\n') | Some('\r') | None => {}
                Some(escaped) => token.push(escaped),
            },
            ':' if !seen_colon => {
                out.target = Some(std::mem::take(&mut token));
                seen_colon = true;
            }
            c if c.is_whitespace() => {
                if !token.is_empty() {
                    let done = std::mem::take(&mut token);
                    if seen_colon {
                        out.deps.push(done);
                    }
                }
            }
            c => token.push(c),
        }
    }

    if seen_colon && !token.is_empty() {
        out.deps.push(token);
    }
    out
}

/// Why an object has to be recompiled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    Forced,
    MissingObject,
    MissingSource,
    SourceNewer,
    MissingDepfile,
    MissingDependency(PathBuf),
    DependencyNewer(PathBuf),
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Staleness::Forced => write!(f, "rebuild forced"),
            Staleness::MissingObject => write!(f, "object missing"),
            Staleness::MissingSource => write!(f, "source missing"),
            Staleness::SourceNewer => write!(f, "source newer than object"),
            Staleness::MissingDepfile => write!(f, "no depfile yet"),
            Staleness::MissingDependency(p) => write!(f, "dependency {} missing", p.display()),
            Staleness::DependencyNewer(p) => write!(f, "dependency {} changed", p.display()),
        }
    }
}

/// Modification time, or `None` when the path cannot be stat'ed.
pub fn mtime(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

/// Decide whether `object` is stale. `None` means up to date.
pub fn staleness(object: &Path, source: &Path, depfile: &Path, force: bool) -> Option<Staleness> {
    if force {
        return Some(Staleness::Forced);
    }
    let Some(obj_time) = mtime(object) else {
        return Some(Staleness::MissingObject);
    };
    let Some(src_time) = mtime(source) else {
        return Some(Staleness::MissingSource);
    };
    if src_time > obj_time {
        return Some(Staleness::SourceNewer);
    }

    let Ok(bytes) = fs::read(depfile) else {
        return Some(Staleness::MissingDepfile);
    };
    let rule = parse_depfile(&String::from_utf8_lossy(&bytes));

    for dep in rule.deps {
        let dep = PathBuf::from(dep);
        match mtime(&dep) {
            None => return Some(Staleness::MissingDependency(dep)),
            Some(t) if t > obj_time => return Some(Staleness::DependencyNewer(dep)),
            Some(_) => {}
        }
    }
    None
}

/// `true` when `object` has to be recompiled from `source`.
pub fn needs_rebuild(object: &Path, source: &Path, depfile: &Path, force: bool) -> bool {
    match staleness(object, source, depfile, force) {
        Some(reason) => {
            tracing::debug!(object = %object.display(), %reason, "stale");
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    #[test]
    fn test_parse_simple_rule() {
        let d = parse_depfile("obj/main.o: src/main.c include/util.h\n");
        assert_eq!(d.target.as_deref(), Some("obj/main.o"));
        assert_eq!(d.deps, vec!["src/main.c", "include/util.h"]);
    }

    #[test]
    fn test_parse_line_continuations() {
        let d = parse_depfile("a.o: a.c \\\n  b.h \\\r\n  c.h");
        assert_eq!(d.deps, vec!["a.c", "b.h", "c.h"]);
    }

    #[test]
    fn test_continuation_is_not_a_token_boundary() {
        let d = parse_depfile("a.o: long\\\nname.h");
        assert_eq!(d.deps, vec!["longname.h"]);
    }

    #[test]
    fn test_parse_escaped_space_and_colon() {
        let d = parse_depfile("a.o: my\\ dir/x.h odd\\:name.h");
        assert_eq!(d.deps, vec!["my dir/x.h", "odd:name.h"]);
    }

    #[test]
    fn test_only_first_colon_splits() {
        let d = parse_depfile("a.o: c:weird.h");
        assert_eq!(d.deps, vec!["c:weird.h"]);
    }

    #[test]
    fn test_no_colon_means_no_deps() {
        let d = parse_depfile("just some words");
        assert_eq!(d.target, None);
        assert!(d.deps.is_empty());
    }

    #[test]
    fn test_staleness_rules() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let src = root.join("main.c");
        let hdr = root.join("util.h");
        let obj = root.join("main.o");
        let dep = root.join("main.d");

        fs::write(&src, "int main(void){return 0;}").unwrap();
        fs::write(&hdr, "").unwrap();

        // no object yet
        assert_eq!(
            staleness(&obj, &src, &dep, false),
            Some(Staleness::MissingObject)
        );

        let base = SystemTime::now() - Duration::from_secs(100);
        fs::write(&obj, "").unwrap();
        set_mtime(&src, base);
        set_mtime(&hdr, base);
        set_mtime(&obj, base + Duration::from_secs(10));

        // object exists but the compiler never wrote a depfile
        assert_eq!(
            staleness(&obj, &src, &dep, false),
            Some(Staleness::MissingDepfile)
        );

        fs::write(
            &dep,
            format!("{}: {} {}\n", obj.display(), src.display(), hdr.display()),
        )
        .unwrap();
        assert_eq!(staleness(&obj, &src, &dep, false), None);
        assert_eq!(staleness(&obj, &src, &dep, true), Some(Staleness::Forced));

        set_mtime(&hdr, base + Duration::from_secs(20));
        assert_eq!(
            staleness(&obj, &src, &dep, false),
            Some(Staleness::DependencyNewer(hdr.clone()))
        );

        set_mtime(&hdr, base);
        set_mtime(&src, base + Duration::from_secs(20));
        assert_eq!(
            staleness(&obj, &src, &dep, false),
            Some(Staleness::SourceNewer)
        );
    }

    #[test]
    fn test_missing_listed_dependency_forces_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let src = root.join("a.c");
        let obj = root.join("a.o");
        let dep = root.join("a.d");
        fs::write(&src, "").unwrap();
        fs::write(&obj, "").unwrap();
        set_mtime(&src, SystemTime::now() - Duration::from_secs(60));
        fs::write(&dep, format!("a.o: {}", root.join("gone.h").display())).unwrap();

        assert!(needs_rebuild(&obj, &src, &dep, false));
    }
}
