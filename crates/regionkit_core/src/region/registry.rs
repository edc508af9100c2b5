//! Type-name keyed registry of region factories.
//!
//! Regions are late-bound: callers construct, describe and restore them by
//! type name without compiling against the concrete type.

use super::{coerce_parameter, Region, RegionError, RegionImpl, RegionResult, RegionType};
use super::REGION_ENVELOPE_VERSION;
use crate::persist::codec::{read_str, read_version};
use crate::persist;
use crate::regions::{DatabaseOutRegion, ScalarSourceRegion};
use crate::spec::{AccessMode, Spec, SpecError};
use crate::types::ValueMap;
use log::info;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::io::Read;
use std::path::Path;

type CreateFn = fn(&ValueMap) -> RegionResult<Box<dyn RegionImpl>>;
type RestoreFn = fn(&mut dyn Read) -> RegionResult<Box<dyn RegionImpl>>;

/// Factory functions for one region type.
#[derive(Clone, Copy)]
pub struct RegionFactory {
    type_name: &'static str,
    spec: fn() -> &'static Spec,
    create: CreateFn,
    restore: RestoreFn,
}

impl RegionFactory {
    pub fn of<T: RegionType>() -> Self {
        Self {
            type_name: T::TYPE_NAME,
            spec: T::create_spec,
            create: create_boxed::<T>,
            restore: restore_boxed::<T>,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn spec(&self) -> &'static Spec {
        (self.spec)()
    }
}

fn create_boxed<T: RegionType>(params: &ValueMap) -> RegionResult<Box<dyn RegionImpl>> {
    Ok(Box::new(T::from_params(params)?))
}

fn restore_boxed<T: RegionType>(reader: &mut dyn Read) -> RegionResult<Box<dyn RegionImpl>> {
    Ok(Box::new(T::from_persisted(reader)?))
}

impl Debug for RegionFactory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionFactory")
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// In-process registry of region types.
#[derive(Debug, Default)]
pub struct RegionRegistry {
    factories: BTreeMap<&'static str, RegionFactory>,
}

impl RegionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every region type shipped in this crate.
    pub fn with_builtin_regions() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_builtin_regions()?;
        Ok(registry)
    }

    pub fn register_builtin_regions(&mut self) -> Result<(), RegistryError> {
        self.register::<DatabaseOutRegion>()?;
        self.register::<ScalarSourceRegion>()
    }

    pub fn register<T: RegionType>(&mut self) -> Result<(), RegistryError> {
        self.register_factory(RegionFactory::of::<T>())
    }

    /// Registers one factory after spec validation.
    pub fn register_factory(&mut self, factory: RegionFactory) -> Result<(), RegistryError> {
        let type_name = factory.type_name();
        if type_name.trim().is_empty() {
            return Err(RegistryError::EmptyTypeName);
        }
        if self.factories.contains_key(type_name) {
            return Err(RegistryError::DuplicateType(type_name.to_string()));
        }
        factory
            .spec()
            .validate()
            .map_err(|err| RegistryError::InvalidSpec {
                type_name: type_name.to_string(),
                source: err,
            })?;

        self.factories.insert(type_name, factory);
        info!(
            "event=region_register module=registry status=ok type={}",
            type_name
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    pub fn spec(&self, type_name: &str) -> Option<&'static Spec> {
        self.factories.get(type_name).map(RegionFactory::spec)
    }

    /// Constructs a region from a parameter bundle validated against its spec.
    pub fn create(
        &self,
        type_name: &str,
        region_name: &str,
        params: &ValueMap,
    ) -> RegionResult<Region> {
        let factory = self.factory(type_name)?;
        let params = validate_params(factory.spec(), region_name, params)?;
        let imp = (factory.create)(&params)?;
        info!(
            "event=region_create module=registry status=ok type={} region={}",
            type_name, region_name
        );
        Region::new(region_name, imp)
    }

    /// Reconstructs a region from a payload written by `Region::save`.
    pub fn restore(&self, reader: &mut dyn Read) -> RegionResult<Region> {
        read_version(reader, REGION_ENVELOPE_VERSION..=REGION_ENVELOPE_VERSION)?;
        let type_name = read_str(reader)?;
        let region_name = read_str(reader)?;
        let factory = self.factory(&type_name)?;
        let imp = (factory.restore)(reader)?;
        info!(
            "event=region_restore module=registry status=ok type={} region={}",
            type_name, region_name
        );
        Region::new(region_name, imp)
    }

    pub fn restore_from_file(&self, path: impl AsRef<Path>) -> RegionResult<Region> {
        persist::read_file(path, |reader| self.restore(reader))
    }

    fn factory(&self, type_name: &str) -> RegionResult<&RegionFactory> {
        self.factories
            .get(type_name)
            .ok_or_else(|| RegionError::UnknownRegionType(type_name.to_string()))
    }
}

/// Checks bundle names against the spec and coerces values to declared types.
fn validate_params(spec: &Spec, region_name: &str, params: &ValueMap) -> RegionResult<ValueMap> {
    let mut validated = ValueMap::new();
    for (name, value) in params.iter() {
        let parameter = spec
            .parameter(name)
            .ok_or_else(|| RegionError::UnknownParameter {
                region: region_name.to_string(),
                name: name.to_string(),
            })?;
        if parameter.access == AccessMode::ReadOnly {
            return Err(RegionError::AccessViolation {
                region: region_name.to_string(),
                name: name.to_string(),
                access: parameter.access,
            });
        }
        validated.insert(name, coerce_parameter(parameter, value.clone())?);
    }
    Ok(validated)
}

/// Registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    EmptyTypeName,
    DuplicateType(String),
    InvalidSpec { type_name: String, source: SpecError },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTypeName => write!(f, "region type name must not be empty"),
            Self::DuplicateType(type_name) => {
                write!(f, "region type already registered: {type_name}")
            }
            Self::InvalidSpec { type_name, source } => {
                write!(f, "region type {type_name} has an invalid spec: {source}")
            }
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidSpec { source, .. } => Some(source),
            _ => None,
        }
    }
}
