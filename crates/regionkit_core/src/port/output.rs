//! Output ports: producer-owned buffers.

use crate::port::PortError;
use crate::types::{Array, BasicType};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Named output slot owning the buffer it publishes.
///
/// Downstream inputs hold only weak references, so dropping the output (or
/// its region) invalidates every view. The width is fixed at construction.
#[derive(Debug)]
pub struct Output {
    name: String,
    data_type: BasicType,
    count: usize,
    buffer: Rc<RefCell<Array>>,
}

impl Output {
    /// Creates an output with a zero-filled buffer of `count` elements.
    pub fn new(name: &str, data_type: BasicType, count: usize) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            count,
            buffer: Rc::new(RefCell::new(Array::zeros(data_type, count))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> BasicType {
        self.data_type
    }

    pub fn element_count(&self) -> usize {
        self.count
    }

    /// Whether at least one live input views this buffer.
    pub fn is_connected(&self) -> bool {
        Rc::weak_count(&self.buffer) > 0
    }

    /// Replaces the published buffer; type and width must match.
    pub fn set_data(&mut self, data: Array) -> Result<(), PortError> {
        if data.basic_type() != self.data_type {
            return Err(PortError::TypeMismatch {
                port: self.name.clone(),
                expected: self.data_type,
                found: data.basic_type(),
            });
        }
        if data.len() != self.count {
            return Err(PortError::WidthChanged {
                port: self.name.clone(),
                frozen: self.count,
                current: data.len(),
            });
        }
        *self.buffer.borrow_mut() = data;
        Ok(())
    }

    /// Copy of the current buffer contents.
    pub fn snapshot(&self) -> Array {
        self.buffer.borrow().clone()
    }

    pub(crate) fn share(&self) -> Weak<RefCell<Array>> {
        Rc::downgrade(&self.buffer)
    }
}
