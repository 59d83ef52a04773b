use std::process::Command;

fn git(args: &[&str]) -> Option<String> {
    let out = Command::new("git").args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8(out.stdout).ok()?;
    Some(text.trim().to_string())
}

/// Emits `BLOCKGRID_BUILD` as `<short hash>[+dirty] <commit date>`, or an empty
/// string when building outside a git checkout (e.g. from a crates.io tarball).
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");

    let info = git(&["log", "-1", "--format=%h %cd", "--date=short"])
        .filter(|line| !line.is_empty())
        .map(|line| {
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
                .is_some_and(|s| !s.is_empty());
            if !dirty {
                return line;
            }
            match line.split_once(' ') {
                Some((hash, date)) => format!("{}+dirty {}", hash, date),
                None => format!("{}+dirty", line),
            }
        })
        .unwrap_or_default();

    println!("cargo:rustc-env=BLOCKGRID_BUILD={}", info);
}
