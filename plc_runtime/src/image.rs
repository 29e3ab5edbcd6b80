//! Process image: the arena of mapped variable cells.
//!
//! The compiled program and the scan cycle share one `ProcessImage`. Cells
//! are allocated once, before setup, from the program's located variables;
//! both sides then hold typed [`Var`] handles instead of raw addresses.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

use plc_common::iec::{ElementaryType, IecType, IecValue};
use plc_common::located::{LocatedAddress, LocatedVariable};
use thiserror::Error;
use tracing::debug;

/// Errors raised while resolving handles.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("variable {0} is not declared by the program")]
    NotDeclared(LocatedAddress),

    #[error("variable {address} is {declared}, requested as {requested}")]
    TypeMismatch {
        address: LocatedAddress,
        declared: ElementaryType,
        requested: ElementaryType,
    },
}

/// Typed handle of one cell.
///
/// Only a `ProcessImage` hands these out, and only for cells whose type
/// matches `T`.
pub struct Var<T> {
    index: u32,
    _ty: PhantomData<fn() -> T>,
}

impl<T> Var<T> {
    fn new(index: usize) -> Self {
        Self {
            index: index as u32,
            _ty: PhantomData,
        }
    }

    /// Arena slot.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for Var<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Var<T> {}

impl<T> PartialEq for Var<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl<T> Eq for Var<T> {}

impl<T> fmt::Debug for Var<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var#{}", self.index)
    }
}

/// Arena of typed cells, optionally keyed by located address.
#[derive(Debug, Default, Clone)]
pub struct ProcessImage {
    cells: Vec<IecValue>,
    addresses: Vec<Option<LocatedAddress>>,
    by_address: HashMap<LocatedAddress, usize>,
}

impl ProcessImage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Image holding one zeroed cell per declared variable.
    pub fn from_located(vars: &[LocatedVariable]) -> Self {
        let mut image = Self::new();
        for var in vars {
            image.declare(var);
        }
        image
    }

    /// Allocate a zeroed cell for a located variable.
    ///
    /// Declaring an address twice keeps the first cell.
    pub fn declare(&mut self, var: &LocatedVariable) -> usize {
        if let Some(&index) = self.by_address.get(&var.address) {
            debug!("{} declared twice, keeping first declaration", var.address);
            return index;
        }
        let index = self.push(var.ty.zero(), Some(var.address.clone()));
        self.by_address.insert(var.address.clone(), index);
        index
    }

    /// Allocate an anonymous cell.
    pub fn alloc<T: IecType>(&mut self, init: T) -> Var<T> {
        Var::new(self.push(init.into_value(), None))
    }

    fn push(&mut self, value: IecValue, address: Option<LocatedAddress>) -> usize {
        self.cells.push(value);
        self.addresses.push(address);
        self.cells.len() - 1
    }

    /// Resolve a located variable to a typed handle.
    pub fn lookup<T: IecType>(&self, address: &LocatedAddress) -> Result<Var<T>, ImageError> {
        let index = *self
            .by_address
            .get(address)
            .ok_or_else(|| ImageError::NotDeclared(address.clone()))?;
        let declared = self.cells[index].elementary_type();
        if declared != T::TYPE {
            return Err(ImageError::TypeMismatch {
                address: address.clone(),
                declared,
                requested: T::TYPE,
            });
        }
        Ok(Var::new(index))
    }

    pub fn contains(&self, address: &LocatedAddress) -> bool {
        self.by_address.contains_key(address)
    }

    /// Current value of a cell.
    ///
    /// A handle from another image reads as `T::default()`.
    #[inline]
    pub fn get<T: IecType>(&self, var: Var<T>) -> T {
        self.cells
            .get(var.index())
            .and_then(|v| T::from_value(*v))
            .unwrap_or_default()
    }

    #[inline]
    pub fn set<T: IecType>(&mut self, var: Var<T>, value: T) {
        if let Some(cell) = self.cells.get_mut(var.index()) {
            *cell = value.into_value();
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Located cells in declaration order.
    pub fn located(&self) -> impl Iterator<Item = (&LocatedAddress, IecValue)> + '_ {
        self.addresses
            .iter()
            .zip(&self.cells)
            .filter_map(|(addr, value)| addr.as_ref().map(|a| (a, *value)))
    }
}
