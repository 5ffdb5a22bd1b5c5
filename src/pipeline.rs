//! The translation pipeline. Each step is a [`Pass`] over the whole module;
//! [`translate`] runs them once, in a fixed order chosen so that every pass
//! sees only shapes its predecessors can produce. Running the pipeline on its
//! own output leaves the tree unchanged.

use crate::ast::Module;
use crate::diagnostics::{Diagnostics, TranslateError};
use crate::gotos::GotoElimination;
use crate::lower::{
    AddAbstractMethodBodies, FixBadNames, FlattenNamespaces, LiftNestedClasses, MakeWhileLoop,
    RemoveEmptySwitch, StripAttributes, StripConstraints, StripEnumBaseTypes, StripModifiers,
    StructToClass,
};
use crate::lower::members::{
    ExpandIndexers, ExpandOperators, IndexersToMethods, InlineDelegates, OperatorDeclsToMethods,
    PropertiesToMethods,
};
use crate::merge::MergeOverloads;
use crate::merge::ctors::MergeCtors;
use crate::order::OrderClasses;
use crate::rewrite::{
    CharsToNumbers, ErasePrimitiveTypes, FillNewArrays, FixCatches, FixEmptyThrow,
    InitializeFields, ReplaceDefaultValues, ReplaceFrameworkMembers,
};
use crate::rewrite::statics::ReifyStaticCtors;

pub trait Pass {
    fn name(&self) -> &'static str;

    fn run(&mut self, module: &mut Module, diags: &mut Diagnostics)
    -> Result<(), TranslateError>;
}

/// The full pipeline, in execution order.
pub fn passes() -> Vec<Box<dyn Pass>> {
    vec![
        Box::new(FixBadNames),
        Box::new(LiftNestedClasses),
        Box::new(StripConstraints),
        Box::new(FlattenNamespaces),
        Box::new(StructToClass),
        Box::new(AddAbstractMethodBodies),
        Box::new(MergeCtors),
        Box::new(ReifyStaticCtors),
        Box::new(PropertiesToMethods),
        Box::new(InitializeFields),
        Box::new(MergeOverloads),
        Box::new(FixCatches),
        Box::new(FixEmptyThrow),
        Box::new(OperatorDeclsToMethods),
        Box::new(ExpandOperators),
        Box::new(ExpandIndexers),
        Box::new(IndexersToMethods),
        Box::new(InlineDelegates),
        Box::new(ReplaceFrameworkMembers),
        Box::new(CharsToNumbers),
        Box::new(ErasePrimitiveTypes),
        Box::new(ReplaceDefaultValues),
        Box::new(FillNewArrays),
        Box::new(StripEnumBaseTypes),
        Box::new(StripAttributes),
        Box::new(StripModifiers),
        Box::new(RemoveEmptySwitch),
        Box::new(MakeWhileLoop),
        Box::new(GotoElimination),
        Box::new(OrderClasses),
    ]
}

/// Runs every pass over `module`. Recoverable trouble lands in `diags` as a
/// warning and the affected declaration is left alone; an `Err` means the
/// module as a whole cannot be translated.
pub fn translate(module: &mut Module, diags: &mut Diagnostics) -> Result<(), TranslateError> {
    for mut pass in passes() {
        pass.run(module, diags)?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/t_pipeline.rs"]
mod tests;
