//! Built-in local generators for the bundled arithmetic curriculum.

pub mod arithmetic;

pub use arithmetic::{AddCarry, AddSingle, MulFacts, SubSingle};

use crate::registry::GeneratorRegistry;

pub fn register_builtin(registry: &mut GeneratorRegistry) {
    registry.register("add_single", AddSingle);
    registry.register("sub_single", SubSingle);
    registry.register("add_carry", AddCarry);
    registry.register("mul_facts", MulFacts);
}
