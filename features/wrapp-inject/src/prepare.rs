use std::sync::Arc;

use crate::{
    dependency_graph::DependencyGraph,
    errors::PrepareError,
    signature::Arguments,
    types::{DynValue, Instance, TypeInfo},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Pending,
    InProgress,
    Done,
}

impl DependencyGraph {
    /// Assembles the dependencies for one invocation
    ///
    /// Every entry is materialized once and initialized before it is exposed,
    /// its initializer reading other dependencies and context values from
    /// `arguments`. Each prepared value is added under every key of its entry.
    pub fn prepare(&self, mut arguments: Arguments) -> Result<Arguments, PrepareError> {
        let mut states = vec![State::Pending; self.len()];
        let mut chain = Vec::new();

        for index in 0..self.len() {
            self.prepare_entry(index, &mut arguments, &mut states, &mut chain)?;
        }

        Ok(arguments)
    }

    fn prepare_entry(
        &self,
        index: usize,
        arguments: &mut Arguments,
        states: &mut [State],
        chain: &mut Vec<TypeInfo>,
    ) -> Result<(), PrepareError> {
        let entry = &self.entries()[index];
        match states[index] {
            State::Done => return Ok(()),
            State::InProgress => {
                let mut chain = chain.clone();
                chain.push(entry.info());
                return Err(PrepareError::CircularInitializer { chain });
            }
            State::Pending => {}
        }

        states[index] = State::InProgress;
        chain.push(entry.info());

        let mut value = entry.materialize();

        if let Some(descriptor) = entry.initializer() {
            let method = descriptor.signature().name();

            for param in descriptor.signature().params() {
                match self.index_of(param) {
                    // The receiver itself
                    Some(dependency) if dependency == index => {}
                    Some(dependency) => self.prepare_entry(dependency, arguments, states, chain)?,
                    None if arguments.contains(param) => {}
                    None => {
                        return Err(PrepareError::MissingContext {
                            method,
                            context: *param,
                        })
                    }
                }
            }

            let receiver = <dyn DynValue as DynValue>::as_any_mut(value.value_mut());
            let replacement = descriptor
                .initializer()
                .invoke(receiver, arguments)
                .map_err(|error| PrepareError::InitializerFailed {
                    method,
                    error: Arc::new(error),
                })?;

            if let Some(replacement) = replacement {
                value.replace(replacement);
            }
        }

        let info = value.info();
        let shared = value.into_shared();
        for key in self.keys_of(index) {
            let exposed = if *key == info {
                shared.clone()
            } else {
                entry
                    .template()
                    .descriptor()
                    .upcast(key, shared.clone())
                    .ok_or(PrepareError::UpcastFailed {
                        interface: *key,
                        actual: info,
                    })?
            };
            arguments.insert(Instance::new(*key, exposed));
        }

        tracing::trace!("Prepared {}", info);
        chain.pop();
        states[index] = State::Done;
        Ok(())
    }
}
