//! Order blocks so each one is defined before the blocks that use it.

use std::collections::BTreeMap;

use query_engine_language::ast;

use crate::translation::error::GenerationError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Blocks in dependency order, otherwise in declaration order.
pub(super) fn dependency_order(blocks: &[ast::Block]) -> Result<Vec<&ast::Block>, GenerationError> {
    let by_name: BTreeMap<&str, &ast::Block> = blocks
        .iter()
        .map(|block| (block.name.as_str(), block))
        .collect();

    let mut ordered = Vec::with_capacity(blocks.len());
    let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
    let mut stack: Vec<&str> = vec![];
    for block in blocks {
        visit(block, &by_name, &mut marks, &mut stack, &mut ordered)?;
    }
    Ok(ordered)
}

fn visit<'a>(
    block: &'a ast::Block,
    by_name: &BTreeMap<&str, &'a ast::Block>,
    marks: &mut BTreeMap<&'a str, Mark>,
    stack: &mut Vec<&'a str>,
    ordered: &mut Vec<&'a ast::Block>,
) -> Result<(), GenerationError> {
    match marks.get(block.name.as_str()) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::Visiting) => {
            let start = stack
                .iter()
                .position(|name| *name == block.name)
                .unwrap_or_default();
            let mut cycle: Vec<String> = stack[start..].iter().map(ToString::to_string).collect();
            cycle.push(block.name.clone());
            return Err(GenerationError::CyclicBlocks { blocks: cycle });
        }
        None => {}
    }

    marks.insert(&block.name, Mark::Visiting);
    stack.push(&block.name);
    for dependency in dependencies(block) {
        if let Some(dependency) = by_name.get(dependency) {
            visit(dependency, by_name, marks, stack, ordered)?;
        }
    }
    stack.pop();
    marks.insert(&block.name, Mark::Done);
    ordered.push(block);
    Ok(())
}

/// Source entities of every selection of the block, in order of mention.
fn dependencies(block: &ast::Block) -> Vec<&str> {
    block
        .body
        .selects()
        .into_iter()
        .flat_map(|select| select.sources.iter())
        .map(|source| source.entity.as_str())
        .collect()
}
