//! Local constant folding over the operation sequence.
//!
//! A single left-to-right rewrite keeps a side stack of the literal pushes
//! emitted so far. A binary arithmetic opcode whose two operands are both
//! on top of that stack is replaced by one push of the computed result.
//! Any other operation clears the side stack, so folding never looks past
//! the two preceding operations and never crosses a block boundary.
//!
//! Results are computed with [`apply_binary`], the same routine the VM
//! uses, so a folded program prints exactly what the unfolded one would.

use std::fmt;

use tracing::debug;

use crate::ast::{OpCode, Operation, Program};
use crate::core::{Operand, RootType, TypeTag, WarningDegree};
use crate::vm::traits::{apply_binary, BinaryOp, OpFault};

/// Optimization level for the compiler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    /// Emit the synthesized sequence unchanged.
    None,
    /// Fold adjacent literal arithmetic.
    #[default]
    Fold,
}

/// Statistics about optimizations applied.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OptStats {
    /// Number of operations before optimization.
    pub original_count: usize,
    /// Number of operations after optimization.
    pub optimized_count: usize,
    /// Numeric folds.
    pub constants_folded: usize,
    /// String concatenations folded.
    pub strings_concatenated: usize,
    /// Candidate folds left for the runtime to fault on.
    pub folds_refused: usize,
}

impl OptStats {
    /// Calculate reduction ratio.
    pub fn reduction_ratio(&self) -> f64 {
        if self.original_count == 0 {
            0.0
        } else {
            1.0 - (self.optimized_count as f64 / self.original_count as f64)
        }
    }

    /// Total folds applied.
    pub fn total_folds(&self) -> usize {
        self.constants_folded + self.strings_concatenated
    }
}

impl fmt::Display for OptStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(f, "              OPTIMIZATION STATISTICS                   ")?;
        writeln!(f, "═══════════════════════════════════════════════════════")?;
        writeln!(
            f,
            "Operations: {} → {} ({:.1}% reduction)",
            self.original_count,
            self.optimized_count,
            self.reduction_ratio() * 100.0
        )?;
        writeln!(f, "───────────────────────────────────────────────────────")?;
        writeln!(f, "Constants folded:      {:>6}", self.constants_folded)?;
        writeln!(f, "Strings concatenated:  {:>6}", self.strings_concatenated)?;
        writeln!(f, "Folds refused:         {:>6}", self.folds_refused)?;
        writeln!(f, "═══════════════════════════════════════════════════════")
    }
}

/// Outcome of trying to fold one opcode.
enum Fold {
    /// Replace the two literals and the opcode with this push.
    Value(Operand),
    /// Not a candidate; emit the opcode as is.
    Skip,
    /// A candidate the runtime would fault on; emit unfolded with a warning.
    Refuse(String),
}

/// Constant folder.
#[derive(Debug, Default)]
pub struct Optimizer {
    level: OptLevel,
    stats: OptStats,
}

impl Optimizer {
    /// Create a new optimizer with the given level.
    pub fn new(level: OptLevel) -> Self {
        Self { level, stats: OptStats::default() }
    }

    /// Get optimization statistics.
    pub fn stats(&self) -> &OptStats {
        &self.stats
    }

    /// Rewrite `program` in place.
    ///
    /// Must run before block resolution: folding shifts indices, and only
    /// procedure entry points are renumbered here.
    pub fn optimize(&mut self, program: &mut Program) {
        self.stats = OptStats { original_count: program.operations.len(), ..OptStats::default() };

        if self.level == OptLevel::None {
            self.stats.optimized_count = program.operations.len();
            return;
        }

        let input = std::mem::take(&mut program.operations);
        let mut output: Vec<Operation> = Vec::with_capacity(input.len());
        // Indices into `output` of trailing literal pushes.
        let mut literals: Vec<usize> = Vec::new();

        for op in input {
            if op.is_literal_push() {
                literals.push(output.len());
                output.push(op);
                continue;
            }

            if op.opcode.is_foldable() && literals.len() >= 2 {
                let second = &output[literals[literals.len() - 2]];
                let top = &output[literals[literals.len() - 1]];

                match self.try_fold(op.opcode, second, top) {
                    Fold::Value(result) => {
                        let (warnings, literal) =
                            self.describe(op.opcode, &second.operand, &top.operand, &result);
                        for (degree, message) in warnings {
                            program.diagnostics.warn(degree, message, op.location.clone());
                        }
                        let first = literals[literals.len() - 2];
                        let context = output[first].context;
                        let location = output[first].location.clone();
                        output.truncate(first);
                        literals.truncate(literals.len() - 2);

                        let opcode = if literal { OpCode::PushStr } else { OpCode::Push };
                        literals.push(output.len());
                        output.push(Operation::new(opcode, result, context, location));
                        continue;
                    }
                    Fold::Refuse(reason) => {
                        self.stats.folds_refused += 1;
                        program.diagnostics.warn(WarningDegree::High, reason, op.location.clone());
                    }
                    Fold::Skip => {}
                }
            }

            literals.clear();
            if op.opcode == OpCode::Proc {
                if let Some(sig) = program.procedures.get_mut(&op.operand.value) {
                    sig.entry = output.len();
                }
            }
            output.push(op);
        }

        program.operations = output;
        self.stats.optimized_count = program.operations.len();
        debug!(
            original = self.stats.original_count,
            optimized = self.stats.optimized_count,
            constants_folded = self.stats.constants_folded,
            strings_concatenated = self.stats.strings_concatenated,
            "constant folding complete"
        );
    }

    fn try_fold(&self, opcode: OpCode, second: &Operation, top: &Operation) -> Fold {
        let (a, b) = (&second.operand, &top.operand);
        let strings = a.type_tag == TypeTag::Str && b.type_tag == TypeTag::Str;
        let numbers = a.type_tag.is_numeric() && b.type_tag.is_numeric();

        if (strings && opcode != OpCode::Sum) || (!strings && !numbers) {
            return Fold::Skip;
        }
        let Some(op) = BinaryOp::from_opcode(opcode) else {
            return Fold::Skip;
        };

        match apply_binary(op, a, b) {
            Ok(result) => Fold::Value(result),
            Err(OpFault::DivisionByZero { .. }) => {
                Fold::Refuse(format!("'{} {} {}' divides by zero", a, b, opcode))
            }
            Err(OpFault::TypeMismatch { .. }) => Fold::Refuse(format!(
                "'{}' mixes {} and {} operands and will fail at runtime",
                opcode,
                a.type_tag.root(),
                b.type_tag.root()
            )),
        }
    }

    /// Count the fold and collect its warnings.
    fn describe(
        &mut self,
        opcode: OpCode,
        a: &Operand,
        b: &Operand,
        result: &Operand,
    ) -> (Vec<(WarningDegree, String)>, bool) {
        if result.type_tag == TypeTag::Str {
            self.stats.strings_concatenated += 1;
            return (Vec::new(), true);
        }
        self.stats.constants_folded += 1;

        let mut warnings = Vec::new();
        if a.type_tag != b.type_tag {
            let message = format!(
                "'{}' folds {} and {} operands into {}",
                opcode, a.type_tag, b.type_tag, result.type_tag
            );
            warnings.push((WarningDegree::Common, message));
        }
        if result.type_tag.root() == RootType::Int && wrapped(opcode, a, b, result) {
            let message = format!("'{} {} {}' wraps around to {}", a, b, opcode, result);
            warnings.push((WarningDegree::Minor, message));
        }
        (warnings, false)
    }
}

/// Whether an integer fold lost its exact value to width wrapping.
fn wrapped(opcode: OpCode, a: &Operand, b: &Operand, result: &Operand) -> bool {
    let (Some(x), Some(y), Some(r)) = (a.as_int(), b.as_int(), result.as_int()) else {
        return false;
    };
    let (x, y) = (i128::from(x), i128::from(y));
    let exact = match opcode {
        OpCode::Sum => x + y,
        OpCode::Minus => x - y,
        OpCode::Mult => x * y,
        OpCode::Div if y != 0 => x / y,
        OpCode::Mod if y != 0 => x % y,
        _ => return false,
    };
    exact != i128::from(r)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::synth;

    fn folded(source: &str) -> (Program, OptStats) {
        let mut program = synth(source).unwrap();
        let mut optimizer = Optimizer::new(OptLevel::Fold);
        optimizer.optimize(&mut program);
        (program, optimizer.stats().clone())
    }

    fn operands(program: &Program) -> Vec<String> {
        program.operations.iter().map(|op| op.to_string()).collect()
    }

    #[test]
    fn test_fold_sum() {
        let (program, stats) = folded("1 2 +");
        assert_eq!(operands(&program), vec!["push 3:i64"]);
        assert_eq!(stats.constants_folded, 1);
        assert!(program.diagnostics.is_empty());
    }

    #[test]
    fn test_fold_chains() {
        let (program, stats) = folded("1 2 + 3 * print");
        assert_eq!(operands(&program), vec!["push 9:i64", "call print:proc"]);
        assert_eq!(stats.constants_folded, 2);
        assert_eq!(stats.original_count, 6);
        assert_eq!(stats.optimized_count, 2);
    }

    #[test]
    fn test_fold_concatenates_strings() {
        let (program, stats) = folded("\"ab\" \"cd\" sum");
        assert_eq!(program.operations.len(), 1);
        assert_eq!(program.operations[0].opcode, OpCode::PushStr);
        assert_eq!(program.operations[0].operand, Operand::string("abcd"));
        assert_eq!(stats.strings_concatenated, 1);
    }

    #[test]
    fn test_fold_widens_with_warning() {
        let (program, _) = folded("1i8 1000i32 +");
        assert_eq!(program.operations[0].operand, Operand::int(TypeTag::I32, 1001));
        assert_eq!(program.diagnostics.max_degree(), Some(WarningDegree::Common));
    }

    #[test]
    fn test_wrapped_fold_warns() {
        let (program, _) = folded("127i8 1i8 +");
        assert_eq!(program.operations[0].operand.as_int(), Some(-128));
        assert_eq!(program.diagnostics.max_degree(), Some(WarningDegree::Minor));
    }

    #[test]
    fn test_fold_sum_with_operands() {
        let (program, stats) = folded("40 2 + print");
        assert_eq!(operands(&program), vec!["push 42:i64", "call print:proc"]);
        assert_eq!(stats.total_folds(), 1);
    }

    #[test]
    fn test_widened_fold_that_wraps_warns_twice() {
        let (program, _) = folded("100i8 1000i16 *");
        assert_eq!(program.operations[0].operand.type_tag, TypeTag::I16);
        assert_eq!(program.operations[0].operand.as_int(), Some(i64::from(100_000i32 as i16)));
        let degrees: Vec<_> =
            program.diagnostics.warnings().iter().map(|d| d.degree).collect();
        assert_eq!(degrees, vec![WarningDegree::Common, WarningDegree::Minor]);
    }

    #[test]
    fn test_mixed_roots_not_folded() {
        let (program, stats) = folded("1 1.5 +");
        assert_eq!(program.operations.len(), 3);
        assert_eq!(stats.folds_refused, 1);
        assert_eq!(program.diagnostics.max_degree(), Some(WarningDegree::High));
    }

    #[test]
    fn test_division_by_zero_not_folded() {
        let (program, _) = folded("1 0 /");
        assert_eq!(program.operations.len(), 3);
        assert_eq!(program.diagnostics.max_degree(), Some(WarningDegree::High));
    }

    #[test]
    fn test_no_lookback_past_other_ops() {
        let (program, stats) = folded("1 dup 2 +");
        assert_eq!(program.operations.len(), 4);
        assert_eq!(stats.constants_folded, 0);
    }

    #[test]
    fn test_comparisons_left_alone() {
        let (program, _) = folded("1 2 <");
        assert_eq!(program.operations.len(), 3);
    }

    #[test]
    fn test_string_minus_left_alone() {
        let (program, _) = folded("\"a\" \"b\" -");
        assert_eq!(program.operations.len(), 3);
        assert!(program.diagnostics.is_empty());
    }

    #[test]
    fn test_proc_entry_renumbered() {
        let (program, _) = folded("1 2 + drop proc fun 1 end");
        let sig = &program.procedures["fun"];
        assert_eq!(sig.entry, 2);
        assert_eq!(program.operations[sig.entry].opcode, OpCode::Proc);
    }

    #[test]
    fn test_level_none_is_identity() {
        let mut program = synth("1 2 +").unwrap();
        let before = program.clone();
        let mut optimizer = Optimizer::new(OptLevel::None);
        optimizer.optimize(&mut program);
        assert_eq!(program, before);
    }

    #[test]
    fn test_stats_display() {
        let (_, stats) = folded("1 2 + dup");
        let s = stats.to_string();
        assert!(s.contains("Constants folded"));
        assert!(s.contains("50.0%"));
    }
}
