//! Persisted store of learned commands.
//!
//! One JSON file per device, keyed by MAC, holding an ordered list of
//! name → raw waveform entries. Names are unique and case-sensitive; the
//! file is the single source of truth across restarts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BroadlinkError;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCommand {
    name: String,
    #[serde(with = "hex_data")]
    data: Vec<u8>,
}

mod hex_data {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(&encoded).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug)]
pub struct CommandStore {
    path: PathBuf,
    commands: Vec<StoredCommand>,
}

impl CommandStore {
    /// Open the backing file for one device, starting empty when it does
    /// not exist yet.
    pub fn open(dir: &Path, mac: &[u8; 6]) -> Result<Self, BroadlinkError> {
        let path = dir.join(format!("{}.json", hex::encode(mac)));
        let commands = match fs::read(&path) {
            Ok(raw) => serde_json::from_slice(&raw)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), count = commands.len(), "command store opened");
        Ok(Self { path, commands })
    }

    fn save(&self) -> Result<(), BroadlinkError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(&self.commands)?)?;
        Ok(())
    }

    /// Command names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.commands
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.data.as_slice())
    }

    /// Add a command, replacing any entry with the same name.
    pub fn add(&mut self, name: &str, data: Vec<u8>) -> Result<(), BroadlinkError> {
        match self.commands.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.data = data,
            None => self.commands.push(StoredCommand {
                name: name.to_string(),
                data,
            }),
        }
        self.save()
    }

    /// Rename a command. Returns false when `old` is absent or `new`
    /// already exists; other entries are never touched.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<bool, BroadlinkError> {
        if self.commands.iter().any(|c| c.name == new) {
            return Ok(false);
        }
        let Some(entry) = self.commands.iter_mut().find(|c| c.name == old) else {
            return Ok(false);
        };
        entry.name = new.to_string();
        self.save()?;
        Ok(true)
    }

    /// Delete a command by name. Returns whether it existed.
    pub fn delete(&mut self, name: &str) -> Result<bool, BroadlinkError> {
        let before = self.commands.len();
        self.commands.retain(|c| c.name != name);
        if self.commands.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    pub fn delete_all(&mut self) -> Result<(), BroadlinkError> {
        self.commands.clear();
        self.save()
    }

    /// First free `<prefix><N>` name, counting from 1.
    pub fn next_name(&self, prefix: &str) -> String {
        let mut idx = 1usize;
        loop {
            let candidate = format!("{prefix}{idx}");
            if self.get(&candidate).is_none() {
                return candidate;
            }
            idx += 1;
        }
    }
}
