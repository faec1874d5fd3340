use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::gesture::Gesture;

/// ジェスチャーライブラリをJSONで保存する
///
/// 既存ファイルがあれば先に .bak を作り、書き込みに失敗したら戻す
pub fn save_gestures<P: AsRef<Path>>(path: P, gestures: &[Gesture]) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(gestures)?;

    let backup = backup_path(path);
    let had_previous = path.exists();
    if had_previous {
        fs::copy(path, &backup).context("failed to create gesture library backup")?;
    }

    if let Err(e) = fs::write(path, json) {
        if had_previous {
            let _ = fs::copy(&backup, path);
        }
        return Err(anyhow::Error::new(e).context("failed to write gesture library"));
    }
    Ok(())
}

pub fn load_gestures<P: AsRef<Path>>(path: P) -> Result<Vec<Gesture>> {
    let content = fs::read_to_string(path).context("failed to read gesture library")?;
    let gestures: Vec<Gesture> = serde_json::from_str(&content)?;
    Ok(gestures)
}

fn backup_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".bak");
    std::path::PathBuf::from(name)
}
