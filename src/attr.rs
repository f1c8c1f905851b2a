use std::fmt::Write;

use hashbrown::HashMap;

use crate::backend::{RegisterBackend, RegisterBank};
use crate::bitfield::{FieldValue, RegisterField, RegisterVector};
use crate::enums::AttrMode;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    Field(RegisterField),
    Vector(RegisterVector),
}

impl Accessor {
    pub fn name(&self) -> &'static str {
        match self {
            Accessor::Field(f) => f.name(),
            Accessor::Vector(v) => v.name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub accessor: Accessor,
    pub mode: AttrMode,
}

impl Attribute {
    pub fn new(field: RegisterField, mode: AttrMode) -> Self {
        Attribute { accessor: Accessor::Field(field), mode }
    }

    pub fn vector(vector: RegisterVector, mode: AttrMode) -> Self {
        Attribute { accessor: Accessor::Vector(vector), mode }
    }

    pub fn name(&self) -> &'static str {
        self.accessor.name()
    }
}

/// The named attributes exposed by one device, all backed by one register
/// bank.
#[derive(Debug)]
pub struct AttributeGroup<B: RegisterBackend> {
    pub name: String,
    bank: RegisterBank<B>,
    attributes: Vec<Attribute>,
    index: HashMap<&'static str, usize>,
}

impl<B: RegisterBackend> AttributeGroup<B> {
    pub fn new(name: impl Into<String>, backend: B, attributes: Vec<Attribute>) -> Result<Self> {
        let name = name.into();
        let mut index = HashMap::with_capacity(attributes.len());

        for (i, attr) in attributes.iter().enumerate() {
            if index.insert(attr.name(), i).is_some() {
                return Err(Error::InvalidField(format!(
                    "{}: attribute '{}' defined twice", name, attr.name()
                )));
            }
        }

        log::debug!("AttributeGroup::new - {} with {} attributes", name, attributes.len());

        Ok(AttributeGroup {
            name,
            bank: RegisterBank::new(backend),
            attributes,
            index,
        })
    }

    pub fn bank(&self) -> &RegisterBank<B> {
        &self.bank
    }

    pub fn get(&self, name: &str) -> Result<&Attribute> {
        self.index
            .get(name)
            .map(|&i| &self.attributes[i])
            .ok_or_else(|| Error::NoSuchAttribute(name.to_string()))
    }

    /// Attribute names in declaration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.attributes.iter().map(|a| a.name()).collect()
    }

    pub fn mode(&self, name: &str) -> Result<AttrMode> {
        self.get(name).map(|a| a.mode)
    }

    pub fn show(&self, name: &str) -> Result<String> {
        let attr = self.get(name)?;
        let value = self.read(attr)?;
        Ok(format!("{}\n", value))
    }

    /// Returns the number of bytes consumed, which is all of `buf`.
    pub fn store(&self, name: &str, buf: &str) -> Result<usize> {
        let attr = self.get(name)?;
        if !attr.mode.writable() {
            log::warn!("store to read-only attribute {}/{}", self.name, name);
            return Err(Error::ReadOnly(name.to_string()));
        }

        match &attr.accessor {
            Accessor::Field(f) => self.bank.store(f, buf)?,
            Accessor::Vector(v) => self.bank.locked(|b| v.write(b, buf))?,
        }
        Ok(buf.len())
    }

    fn read(&self, attr: &Attribute) -> Result<FieldValue> {
        match &attr.accessor {
            Accessor::Field(f) => self.bank.show(f),
            Accessor::Vector(v) => self.bank.locked(|b| v.read(b)),
        }
    }

    /// `name: value` for every attribute. A failed read is reported in
    /// place and does not stop the dump.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for attr in &self.attributes {
            match self.read(attr) {
                Ok(v) => {
                    let _ = writeln!(out, "{}: {}", attr.name(), v);
                }
                Err(e) => {
                    log::debug!("dump {}/{} failed: {}", self.name, attr.name(), e);
                    let _ = writeln!(out, "{}: <{}>", attr.name(), e);
                }
            }
        }
        out
    }
}

/// The base GPIO number on the first line, then one line name per line.
pub fn gpio_map_show(base: u32, names: &[&str]) -> String {
    let mut out = format!("{}\n", base);
    for name in names {
        out.push_str(name);
        out.push('\n');
    }
    out
}
