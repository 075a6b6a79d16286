use std::collections::HashMap;

use super::Program;
use crate::driver::Driver;

/// Location of a uniform inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

/// Location of a vertex attribute inside a linked program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttribLocation(pub i32);

/// What drivers return for names a program does not use
const INVALID_LOCATION: i32 = -1;

/// Memoized location lookups, keyed by program and name.
///
/// Negative answers are cached as well: a uniform optimized away by the shader compiler stays
/// absent for the lifetime of the program.
#[derive(Debug, Default)]
pub(crate) struct LocationCache {
    uniforms: HashMap<Program, HashMap<String, i32>>,
    attribs: HashMap<Program, HashMap<String, i32>>,
}

fn lookup<F>(
    cache: &mut HashMap<Program, HashMap<String, i32>>,
    program: Program,
    name: &str,
    query: F,
) -> i32
where
    F: FnOnce() -> i32,
{
    let names = cache.entry(program).or_default();
    if let Some(location) = names.get(name) {
        return *location;
    }
    let location = query();
    names.insert(name.to_owned(), location);
    location
}

impl LocationCache {
    pub(crate) fn new() -> LocationCache {
        LocationCache::default()
    }

    pub(crate) fn uniform_location<D: Driver>(
        &mut self,
        driver: &mut D,
        program: Program,
        name: &str,
    ) -> Option<UniformLocation> {
        let location = lookup(&mut self.uniforms, program, name, || {
            driver.get_uniform_location(program.0, name)
        });
        (location != INVALID_LOCATION).then_some(UniformLocation(location))
    }

    pub(crate) fn attrib_location<D: Driver>(
        &mut self,
        driver: &mut D,
        program: Program,
        name: &str,
    ) -> Option<AttribLocation> {
        let location = lookup(&mut self.attribs, program, name, || {
            driver.get_attrib_location(program.0, name)
        });
        (location != INVALID_LOCATION).then_some(AttribLocation(location))
    }

    pub(crate) fn delete_program(&mut self, program: Program) {
        self.uniforms.remove(&program);
        self.attribs.remove(&program);
    }
}
