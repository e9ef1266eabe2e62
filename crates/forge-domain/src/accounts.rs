//! Bases de cuentas del rootfs (`etc/passwd` y `etc/group`).
//!
//! Representación parseada y re-renderizable de los dos archivos de cuentas
//! que el aprovisionador de identidad muta. Las operaciones son estrictas:
//! crear una cuenta existente o unirse a un grupo inexistente es un error,
//! nunca un éxito silencioso.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::identity::validate_account_name;

/// Entrada de `etc/passwd`: `name:x:uid:gid:gecos:home:shell`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswdEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub gecos: String,
    pub home: String,
    pub shell: String,
}

impl PasswdEntry {
    fn parse_line(line: &str) -> Result<Self, DomainError> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != 7 {
            return Err(DomainError::Validation(format!("Línea de passwd mal formada: '{line}'")));
        }
        let uid = fields[2].parse::<u32>()
                           .map_err(|_| DomainError::Validation(format!("uid inválido en '{line}'")))?;
        let gid = fields[3].parse::<u32>()
                           .map_err(|_| DomainError::Validation(format!("gid inválido en '{line}'")))?;
        Ok(PasswdEntry { name: fields[0].to_string(),
                         uid,
                         gid,
                         gecos: fields[4].to_string(),
                         home: fields[5].to_string(),
                         shell: fields[6].to_string() })
    }

    fn render(&self) -> String {
        format!("{}:x:{}:{}:{}:{}:{}", self.name, self.uid, self.gid, self.gecos, self.home, self.shell)
    }
}

/// Base completa de `etc/passwd`, en orden de archivo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasswdDatabase {
    entries: Vec<PasswdEntry>,
}

impl PasswdDatabase {
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let mut entries = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(PasswdEntry::parse_line(line)?);
        }
        Ok(PasswdDatabase { entries })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for e in &self.entries {
            out.push_str(&e.render());
            out.push('\n');
        }
        out
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&PasswdEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Primer uid libre a partir de `start` (asignación determinista).
    pub fn next_free_uid(&self, start: u32) -> u32 {
        let mut uid = start;
        while self.entries.iter().any(|e| e.uid == uid) {
            uid += 1;
        }
        uid
    }

    /// Agrega una cuenta nueva.
    ///
    /// # Errores
    /// `DomainError::DuplicateAccount` si el nombre ya está registrado.
    pub fn add(&mut self, entry: PasswdEntry) -> Result<(), DomainError> {
        validate_account_name(&entry.name)?;
        if self.contains(&entry.name) {
            return Err(DomainError::DuplicateAccount(entry.name.clone()));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Entrada de `etc/group`: `name:x:gid:member,member`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupEntry {
    pub name: String,
    pub gid: u32,
    pub members: Vec<String>,
}

impl GroupEntry {
    fn parse_line(line: &str) -> Result<Self, DomainError> {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() != 4 {
            return Err(DomainError::Validation(format!("Línea de group mal formada: '{line}'")));
        }
        let gid = fields[2].parse::<u32>()
                           .map_err(|_| DomainError::Validation(format!("gid inválido en '{line}'")))?;
        let members = if fields[3].is_empty() {
            Vec::new()
        } else {
            fields[3].split(',').map(|m| m.to_string()).collect()
        };
        Ok(GroupEntry { name: fields[0].to_string(),
                        gid,
                        members })
    }

    fn render(&self) -> String {
        format!("{}:x:{}:{}", self.name, self.gid, self.members.join(","))
    }
}

/// Base completa de `etc/group`, en orden de archivo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupDatabase {
    entries: Vec<GroupEntry>,
}

impl GroupDatabase {
    pub fn parse(text: &str) -> Result<Self, DomainError> {
        let mut entries = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(GroupEntry::parse_line(line)?);
        }
        Ok(GroupDatabase { entries })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for e in &self.entries {
            out.push_str(&e.render());
            out.push('\n');
        }
        out
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&GroupEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Une `user` al grupo `group` y retorna el gid del grupo.
    ///
    /// # Errores
    /// `DomainError::UnknownGroup` si el grupo no existe en la base; la
    /// pertenencia previa del usuario no es un error (la operación es
    /// idempotente a nivel de membresía, no de existencia del grupo).
    pub fn add_member(&mut self, group: &str, user: &str) -> Result<u32, DomainError> {
        let entry = self.entries
                        .iter_mut()
                        .find(|e| e.name == group)
                        .ok_or_else(|| DomainError::UnknownGroup(group.to_string()))?;
        if !entry.members.iter().any(|m| m == user) {
            entry.members.push(user.to_string());
        }
        Ok(entry.gid)
    }
}
