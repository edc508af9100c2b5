//! Input ports: non-owning views over one upstream output.

use crate::port::output::Output;
use crate::port::PortError;
use crate::spec::InputSpec;
use crate::types::{Array, BasicType};
use std::cell::RefCell;
use std::rc::Weak;

/// Named input slot with at most one upstream link.
#[derive(Debug)]
pub struct Input {
    name: String,
    data_type: BasicType,
    declared_count: usize,
    required: bool,
    link: Option<Link>,
    frozen_count: Option<usize>,
}

#[derive(Debug)]
struct Link {
    source: String,
    buffer: Weak<RefCell<Array>>,
}

impl Input {
    pub fn new(spec: &InputSpec) -> Self {
        Self {
            name: spec.name.clone(),
            data_type: spec.data_type,
            declared_count: spec.count as usize,
            required: spec.required,
            link: None,
            frozen_count: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> BasicType {
        self.data_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Name of the upstream output, when linked.
    pub fn source(&self) -> Option<&str> {
        self.link.as_ref().map(|link| link.source.as_str())
    }

    /// Linked and the upstream buffer is still alive.
    pub fn is_connected(&self) -> bool {
        self.link
            .as_ref()
            .is_some_and(|link| link.buffer.strong_count() > 0)
    }

    /// Frozen width once fixed, else the upstream width when connected,
    /// otherwise the declared count.
    pub fn element_count(&self) -> usize {
        self.frozen_count.unwrap_or_else(|| self.live_count())
    }

    /// Fails when a frozen width no longer matches the upstream buffer.
    pub fn check_width(&self) -> Result<(), PortError> {
        let Some(frozen) = self.frozen_count else {
            return Ok(());
        };
        let current = self.live_count();
        if self.is_connected() && current != frozen {
            return Err(PortError::WidthChanged {
                port: self.name.clone(),
                frozen,
                current,
            });
        }
        Ok(())
    }

    /// Runs `read` over the upstream buffer for the current iteration.
    ///
    /// The view cannot escape the closure.
    pub fn with_data<R>(&self, read: impl FnOnce(&Array) -> R) -> Result<R, PortError> {
        let link = self
            .link
            .as_ref()
            .ok_or_else(|| PortError::NotConnected(self.name.clone()))?;
        let buffer = link
            .buffer
            .upgrade()
            .ok_or_else(|| PortError::UpstreamDropped(self.name.clone()))?;
        let data = buffer.borrow();
        if let Some(frozen) = self.frozen_count {
            if data.len() != frozen {
                return Err(PortError::WidthChanged {
                    port: self.name.clone(),
                    frozen,
                    current: data.len(),
                });
            }
        }
        Ok(read(&data))
    }

    pub(crate) fn connect(&mut self, upstream: &Output) -> Result<(), PortError> {
        if let Some(link) = &self.link {
            return Err(PortError::AlreadyConnected {
                input: self.name.clone(),
                source: link.source.clone(),
            });
        }
        if upstream.data_type() != self.data_type {
            return Err(PortError::TypeMismatch {
                port: self.name.clone(),
                expected: self.data_type,
                found: upstream.data_type(),
            });
        }
        if self.declared_count != 0 && upstream.element_count() != self.declared_count {
            return Err(PortError::WidthMismatch {
                port: self.name.clone(),
                declared: self.declared_count,
                upstream: upstream.element_count(),
            });
        }

        self.link = Some(Link {
            source: upstream.name().to_string(),
            buffer: upstream.share(),
        });
        Ok(())
    }

    pub(crate) fn disconnect(&mut self) {
        self.link = None;
        self.frozen_count = None;
    }

    pub(crate) fn is_frozen(&self) -> bool {
        self.frozen_count.is_some()
    }

    pub(crate) fn freeze(&mut self) {
        self.frozen_count = Some(self.live_count());
    }

    fn live_count(&self) -> usize {
        self.link
            .as_ref()
            .and_then(|link| link.buffer.upgrade())
            .map(|buffer| buffer.borrow().len())
            .unwrap_or(self.declared_count)
    }
}
