mod data;
mod kernel;

use devfn_dtype::Precision;
use devfn_ir::Function;
use indexmap::IndexMap;

use crate::{KernelData, KernelDataManager};

pub(super) fn items(entries: Vec<(&str, KernelData)>) -> IndexMap<String, KernelData> {
    entries.into_iter().map(|(name, data)| (name.to_string(), data)).collect()
}

pub(super) fn manager(entries: Vec<(&str, KernelData)>) -> KernelDataManager {
    KernelDataManager::new(items(entries), Precision::Double).unwrap()
}

pub(super) fn function(source: &str) -> Function {
    Function::parse(source).unwrap()
}
