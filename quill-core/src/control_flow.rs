//! Control-flow graph over a lowered function body.
//!
//! Used to decide whether every path through a non-void function ends in
//! a `return`. Blocks that cannot be reached from the entry are pruned
//! before the check, so dead code after a `return` is not a path.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::bound_tree::{BoundBlockStatement, BoundLabel, BoundStatement};
use crate::value::Value;

type NodeId = usize;

const START: NodeId = 0;
const END: NodeId = 1;

#[derive(Debug, Default)]
pub struct BasicBlock<'a> {
    pub statements: Vec<&'a BoundStatement>,
}

#[derive(Debug)]
pub struct ControlFlowGraph<'a> {
    /// Indexed by node id. `START` and `END` are empty sentinels.
    blocks: Vec<BasicBlock<'a>>,
    edges: HashSet<(NodeId, NodeId)>,
    pruned: HashSet<NodeId>,
}

impl<'a> ControlFlowGraph<'a> {
    pub fn build(body: &'a BoundBlockStatement) -> Self {
        let mut blocks = vec![BasicBlock::default(), BasicBlock::default()];
        let mut current = BasicBlock::default();

        for statement in &body.statements {
            match statement {
                BoundStatement::Label(_) => {
                    if !current.statements.is_empty() {
                        blocks.push(std::mem::take(&mut current));
                    }
                    current.statements.push(statement);
                }
                BoundStatement::Goto(_) | BoundStatement::ConditionalGoto(_) | BoundStatement::Return(_) => {
                    current.statements.push(statement);
                    blocks.push(std::mem::take(&mut current));
                }
                _ => current.statements.push(statement),
            }
        }
        if !current.statements.is_empty() {
            blocks.push(current);
        }

        let mut graph = ControlFlowGraph {
            blocks,
            edges: HashSet::new(),
            pruned: HashSet::new(),
        };
        graph.connect();
        graph.prune_unreachable();
        graph
    }

    fn connect(&mut self) {
        let first_block = 2;
        let block_count = self.blocks.len();

        let labels: HashMap<&BoundLabel, NodeId> = (first_block..block_count)
            .filter_map(|id| match self.blocks[id].statements.first() {
                Some(BoundStatement::Label(label)) => Some((label, id)),
                _ => None,
            })
            .collect();

        let mut edges = HashSet::new();
        edges.insert((START, if block_count > first_block { first_block } else { END }));

        for id in first_block..block_count {
            let next = if id + 1 < block_count { id + 1 } else { END };
            match self.blocks[id].statements.last() {
                Some(BoundStatement::Goto(label)) => {
                    edges.insert((id, labels.get(label).copied().unwrap_or(END)));
                }
                Some(BoundStatement::ConditionalGoto(goto)) => {
                    let target = labels.get(&goto.label).copied().unwrap_or(END);
                    match goto.condition.constant() {
                        Some(Value::Bool(value)) if *value == goto.jump_if_true => {
                            edges.insert((id, target));
                        }
                        Some(Value::Bool(_)) => {
                            edges.insert((id, next));
                        }
                        _ => {
                            edges.insert((id, target));
                            edges.insert((id, next));
                        }
                    }
                }
                Some(BoundStatement::Return(_)) => {
                    edges.insert((id, END));
                }
                _ => {
                    edges.insert((id, next));
                }
            }
        }

        self.edges = edges;
    }

    /// Drop every block not reachable from `START`. Dead cycles, such as
    /// a loop after a `return`, feed each other and must go too.
    fn prune_unreachable(&mut self) {
        let mut reached = HashSet::from([START]);
        let mut pending = VecDeque::from([START]);
        while let Some(node) = pending.pop_front() {
            for &(from, to) in &self.edges {
                if from == node && reached.insert(to) {
                    pending.push_back(to);
                }
            }
        }

        self.pruned = (2..self.blocks.len()).filter(|id| !reached.contains(id)).collect();
        let pruned = &self.pruned;
        self.edges
            .retain(|(from, to)| !pruned.contains(from) && !pruned.contains(to));
    }

    pub fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |(_, to)| *to == node)
            .map(|(from, _)| *from)
    }

    /// True when every edge into the exit comes from a `return`.
    pub fn all_paths_return(&self) -> bool {
        self.predecessors(END).all(|from| {
            from != START
                && matches!(self.blocks[from].statements.last(), Some(BoundStatement::Return(_)))
        })
    }

    /// Reachable basic blocks, sentinels excluded.
    pub fn block_count(&self) -> usize {
        self.blocks.len() - 2 - self.pruned.len()
    }
}

pub fn all_paths_return(body: &BoundBlockStatement) -> bool {
    ControlFlowGraph::build(body).all_paths_return()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bound_tree::BoundExpression;
    use crate::symbols::VariableSymbol;
    use crate::types::TypeSymbol;

    fn label(name: &str) -> BoundLabel {
        BoundLabel::new(name)
    }

    fn unknown_condition() -> BoundExpression {
        BoundExpression::variable(VariableSymbol::local("c", TypeSymbol::Bool, false))
    }

    fn ret() -> BoundStatement {
        BoundStatement::Return(Some(BoundExpression::literal(1)))
    }

    #[test]
    fn empty_body_does_not_return() {
        assert!(!all_paths_return(&BoundBlockStatement::default()));
    }

    #[test]
    fn both_branches_returning_is_enough() {
        // gotoFalse c ELSE; return; ELSE:; return
        let body = BoundBlockStatement::new(vec![
            BoundStatement::goto_if(label("else"), unknown_condition(), false),
            ret(),
            BoundStatement::Label(label("else")),
            ret(),
        ]);
        assert!(all_paths_return(&body));
    }

    #[test]
    fn missing_else_falls_through() {
        // gotoFalse c END; return; END:
        let body = BoundBlockStatement::new(vec![
            BoundStatement::goto_if(label("end"), unknown_condition(), false),
            ret(),
            BoundStatement::Label(label("end")),
        ]);
        assert!(!all_paths_return(&body));
    }

    #[test]
    fn dead_code_after_return_is_pruned() {
        let body = BoundBlockStatement::new(vec![
            ret(),
            BoundStatement::Expression(BoundExpression::literal(2)),
        ]);
        let graph = ControlFlowGraph::build(&body);
        assert_eq!(graph.block_count(), 1);
        assert!(graph.all_paths_return());
    }

    #[test]
    fn constant_true_loop_never_exits() {
        // goto CHECK; BODY:; return; CHECK:; gotoTrue true BODY; BREAK:
        let body = BoundBlockStatement::new(vec![
            BoundStatement::Goto(label("check")),
            BoundStatement::Label(label("body")),
            ret(),
            BoundStatement::Label(label("check")),
            BoundStatement::goto_if(label("body"), BoundExpression::literal(true), true),
            BoundStatement::Label(label("break")),
        ]);
        assert!(all_paths_return(&body));
    }

    #[test]
    fn dead_loop_after_return_is_pruned() {
        // return; goto CHECK; BODY:; CHECK:; gotoTrue c BODY; BREAK:
        let body = BoundBlockStatement::new(vec![
            ret(),
            BoundStatement::Goto(label("check")),
            BoundStatement::Label(label("body")),
            BoundStatement::Label(label("check")),
            BoundStatement::goto_if(label("body"), unknown_condition(), true),
            BoundStatement::Label(label("break")),
        ]);
        let graph = ControlFlowGraph::build(&body);
        assert_eq!(graph.block_count(), 1);
        assert!(graph.all_paths_return());
    }
}
