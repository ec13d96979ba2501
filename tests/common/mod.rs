//! Shared fixtures: temporary projects and a fake `sh` compiler.
//!
//! The fake compiler understands just enough of the cc command line:
//!
//! - `-c ... -MF dep -o obj src.c` writes an object and a depfile listing
//!   the source plus every `*.h` next to it; fails when the source
//!   contains `#error`
//! - `-o exe objs...` writes a tiny shell script as the "binary"; while
//!   `fail_links` is on it leaves a partial file behind and exits 1
//! - `-I root -I include -o gen tackfile_gen.c` builds a generator that
//!   copies `tackfile.fake.ini`, failing when `tackfile.c` has `#error`
//!
//! Every invocation is appended to `cc.log` next to the script.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tack::toolchain::{CompilerSource, Toolchain};
use walkdir::WalkDir;

const FAKE_CC: &str = r##"#!/bin/sh
here=$(dirname "$0")
mode=link; out=""; dep=""; srcs=""; objs=""; incs=""
while [ $# -gt 0 ]; do
  case "$1" in
    -c) mode=compile ;;
    -o) out="$2"; shift ;;
    -MF) dep="$2"; shift ;;
    -I) incs="$incs $2"; shift ;;
    *.c) srcs="$srcs $1" ;;
    *.o) objs="$objs $1" ;;
  esac
  shift
done

if [ "$mode" = compile ]; then
  echo "compile$srcs" >> "$here/cc.log"
  for s in $srcs; do
    if grep -q '#error' "$s"; then echo "$s:1: error: #error" >&2; exit 1; fi
    { echo "obj"; cat "$s"; } > "$out"
    printf '%s: %s' "$out" "$s" > "$dep"
    for h in "$(dirname "$s")"/*.h; do
      [ -f "$h" ] && printf ' \\\n  %s' "$h" >> "$dep"
    done
    echo >> "$dep"
  done
  exit 0
fi

case "$srcs" in
  *tackfile_gen.c*)
    echo "bootstrap" >> "$here/cc.log"
    root=$(echo $incs | cut -d' ' -f1)
    if grep -q '#error' "$root/tackfile.c"; then echo "tackfile.c:1: error: #error" >&2; exit 1; fi
    printf '#!/bin/sh\ncp "%s/tackfile.fake.ini" "$1"\n' "$root" > "$out"
    chmod +x "$out"
    exit 0
    ;;
esac

echo "link $out" >> "$here/cc.log"
if [ -f "$here/link.fail" ]; then
  echo "partial" > "$out"
  echo "ld: cannot link" >&2
  exit 1
fi
for o in $objs; do
  [ -f "$o" ] || { echo "missing $o" >&2; exit 1; }
done
printf '#!/bin/sh\necho "linked $*"\n' > "$out"
chmod +x "$out"
"##;

pub struct Project {
    pub dir: tempfile::TempDir,
    cc: PathBuf,
}

impl Project {
    /// Empty project directory with the fake compiler installed.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let tooling = dir.path().join(".fakecc");
        fs::create_dir_all(&tooling).unwrap();
        let cc = tooling.join("fakecc");
        fs::write(&cc, FAKE_CC).unwrap();
        fs::set_permissions(&cc, fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, cc }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn cc(&self) -> &Path {
        &self.cc
    }

    pub fn toolchain(&self) -> Toolchain {
        Toolchain::new(self.cc.to_string_lossy(), CompilerSource::Env)
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    pub fn mkdir(&self, rel: &str) {
        fs::create_dir_all(self.root().join(rel)).unwrap();
    }

    /// Make every following link fail after writing a partial output.
    pub fn fail_links(&self, fail: bool) {
        let flag = self.cc.with_file_name("link.fail");
        if fail {
            fs::write(flag, "").unwrap();
        } else {
            let _ = fs::remove_file(flag);
        }
    }

    /// Lines the fake compiler logged so far.
    pub fn log(&self) -> Vec<String> {
        fs::read_to_string(self.cc.with_file_name("cc.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    /// Backdate the whole project: sources well into the past, build
    /// outputs less so. Files the test writes afterwards are then strictly
    /// newer than everything, whatever the filesystem's timestamp grain.
    pub fn settle(&self) {
        let now = SystemTime::now();
        let build_dir = self.root().join("build");
        let walker = WalkDir::new(self.root())
            .into_iter()
            .filter_entry(|e| e.file_name() != ".fakecc");
        for entry in walker.flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            let age = if entry.path().starts_with(&build_dir) { 120 } else { 600 };
            fs::File::options()
                .write(true)
                .open(entry.path())
                .unwrap()
                .set_modified(now - Duration::from_secs(age))
                .unwrap();
        }
    }
}
