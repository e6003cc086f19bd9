use crate::error::{NetlistError, NetlistResult};
use crate::structs::gates::{Gate, GateOp};
use crate::structs::graph::ModuleGraph;
use crate::structs::module::{Module, SubcircuitInstance};
use crate::structs::wire::{is_constant_name, Domain, WireAllocator, WireId, TRUE_NAME};
use itertools::Itertools;
use regex::Regex;
use std::collections::HashSet;

/// Captures the name of a bus from one of its bits, e.g. `data` from `data[3]`.
const BUS_REGEX: &str = r"^([^\[]+)\[";

/// Options shared by the netlist parsers.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ParseOptions {
    /// Name of the top module. Each parser has its own default.
    pub top: Option<String>,
}

/// One logical BLIF line, after comment stripping and continuation joining.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    /// 1-based number of the first physical line.
    pub line: usize,
    pub tokens: Vec<String>,
}

impl Record {
    pub fn keyword(&self) -> &str {
        &self.tokens[0]
    }

    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }
}

/// Split BLIF text into records. Blank lines and `#` comments are dropped,
/// and a trailing `\` joins a line with the next one.
pub fn records(text: &str) -> Vec<Record> {
    let mut records = vec![];
    let mut tokens: Vec<String> = vec![];
    let mut start = 0;

    for (i, raw) in text.lines().enumerate() {
        let content = raw.split('#').next().unwrap_or("").trim_end();
        let (content, continued) = match content.strip_suffix('\\') {
            Some(head) => (head, true),
            None => (content, false),
        };
        if tokens.is_empty() {
            start = i + 1;
        }
        tokens.extend(content.split_whitespace().map(String::from));
        if !continued && !tokens.is_empty() {
            records.push(Record {
                line: start,
                tokens: std::mem::take(&mut tokens),
            });
        }
    }
    if !tokens.is_empty() {
        records.push(Record { line: start, tokens });
    }
    records
}

/// Constant nets, plus the undefined net of Yosys which is left undriven.
fn is_constant_net(name: &str) -> bool {
    is_constant_name(name) || name == "$undef"
}

/// Split a `pin=wire` token.
pub fn split_binding(token: &str, line: usize) -> NetlistResult<(&str, &str)> {
    match token.find('=') {
        Some(i) if i > 0 && i + 1 < token.len() => Ok((&token[..i], &token[i + 1..])),
        _ => Err(NetlistError::parse(line, format!("expected pin=wire, got '{}'", token))),
    }
}

/// Order port tokens for allocation: consecutive tokens of the same bus
/// (same name before `[`, as captured by `bus`) are reversed as a group.
pub fn bus_order<'a>(bus: &Regex, tokens: &[&'a str]) -> Vec<&'a str> {
    let base = |token: &'a str| -> &'a str {
        match bus.captures(token).and_then(|c| c.get(1)) {
            Some(m) => m.as_str(),
            None => token,
        }
    };

    let mut ordered = Vec::with_capacity(tokens.len());
    for (_, group) in &tokens.iter().group_by(|t| base(**t)) {
        let mut bits: Vec<&str> = group.copied().collect();
        bits.reverse();
        ordered.extend(bits);
    }
    ordered
}

/// Parse a BLIF netlist into a module graph, then resolve the direction of every instance.
///
/// The first model is the top unless `options.top` names another one.
///
/// # Example
/// ```
/// use bristolify::producers::blif::{parse_blif, ParseOptions};
/// use bristolify::structs::wire::Domain;
///
/// let text = "
/// .model top
/// .inputs a b
/// .outputs y
/// .gate AND A=a B=b Y=y
/// .end
/// ";
/// let graph = parse_blif(text, Domain::Boolean, &ParseOptions::default()).unwrap();
/// let top = graph.top().unwrap();
/// assert_eq!(top.inputs, vec![2, 3]);
/// assert_eq!(top.gates.len(), 1);
/// ```
pub fn parse_blif(text: &str, domain: Domain, options: &ParseOptions) -> NetlistResult<ModuleGraph> {
    parse_blif_with(text, WireAllocator::new(domain), options)
}

/// Like `parse_blif`, numbering wires with an existing allocator.
pub fn parse_blif_with(
    text: &str,
    allocator: WireAllocator,
    options: &ParseOptions,
) -> NetlistResult<ModuleGraph> {
    parse_blif_texts(std::iter::once(text), allocator, options)
}

/// Parse several BLIF texts as one netlist. Models may reference models of any text.
pub fn parse_blif_texts<'t>(
    texts: impl IntoIterator<Item = &'t str>,
    allocator: WireAllocator,
    options: &ParseOptions,
) -> NetlistResult<ModuleGraph> {
    let mut parser = BlifParser::new(allocator);
    for text in texts {
        for record in records(text) {
            parser.ingest_record(&record)?;
        }
        parser.end_of_text()?;
    }
    let mut graph = parser.finish()?;
    if let Some(top) = &options.top {
        graph.set_top(top)?;
    }
    graph.resolve_directions()?;
    Ok(graph)
}

/// Streams BLIF records into a ModuleGraph. Directions are not resolved.
pub struct BlifParser {
    graph: ModuleGraph,
    current: Option<Module>,
    /// The cover line allowed after the last `.names`.
    expect_cover: Option<&'static str>,
    last_line: usize,
    bus: Regex,
}

impl BlifParser {
    pub fn new(allocator: WireAllocator) -> BlifParser {
        BlifParser {
            graph: ModuleGraph::with_allocator(allocator),
            current: None,
            expect_cover: None,
            last_line: 0,
            bus: Regex::new(BUS_REGEX).unwrap(),
        }
    }

    /// A model cannot span two texts.
    pub fn end_of_text(&mut self) -> NetlistResult<()> {
        if let Some(module) = &self.current {
            return Err(NetlistError::parse(
                self.last_line,
                format!("end of file inside model '{}'", module.name),
            ));
        }
        self.expect_cover = None;
        Ok(())
    }

    pub fn finish(mut self) -> NetlistResult<ModuleGraph> {
        self.end_of_text()?;
        Ok(self.graph)
    }

    pub fn ingest_record(&mut self, record: &Record) -> NetlistResult<()> {
        let line = record.line;
        self.last_line = line;
        let args = record.args();

        if !record.keyword().starts_with('.') {
            // The only covers we understand are those of a buffer and of constant 1.
            if self.expect_cover == Some(&record.tokens.join(" ")[..]) {
                self.expect_cover = None;
                return Ok(());
            }
            return Err(NetlistError::parse(
                line,
                format!("unsupported logic cover '{}'", record.tokens.join(" ")),
            ));
        }
        self.expect_cover = None;

        match record.keyword() {
            ".model" => {
                if let Some(module) = &self.current {
                    return Err(NetlistError::parse(
                        line,
                        format!("nested .model inside '{}'", module.name),
                    ));
                }
                let name = match args {
                    [name] => name,
                    _ => return Err(NetlistError::parse(line, ".model takes exactly one name")),
                };
                if self.graph.contains(name) {
                    return Err(NetlistError::parse(line, format!("duplicate model '{}'", name)));
                }
                self.current = Some(Module::new(name.as_str(), self.graph.domain()));
            }

            ".inputs" | ".outputs" => {
                let tokens: Vec<&str> = args.iter().map(|s| s.as_str()).collect();
                let mut ids = vec![];
                for name in bus_order(&self.bus, &tokens) {
                    ids.push(self.graph.allocator.id_for(name)?);
                }
                let is_input = record.keyword() == ".inputs";
                let module = self.module(line)?;
                for id in ids {
                    if is_input {
                        module.add_input(id);
                    } else {
                        module.add_output(id);
                    }
                }
            }

            ".gate" => {
                let (op, bindings) = match args.split_first() {
                    Some((op, bindings)) if !bindings.is_empty() => (GateOp::parse(op), bindings),
                    _ => return Err(NetlistError::parse(line, ".gate needs an operator and an output")),
                };
                let mut wires = vec![];
                for token in bindings {
                    let (_pin, wire) = split_binding(token, line)?;
                    wires.push(self.graph.allocator.id_for(wire)?);
                }
                let output = wires.pop().unwrap_or_default();
                if let Some(arity) = op.arity() {
                    if wires.len() != arity {
                        return Err(NetlistError::parse(
                            line,
                            format!("{} takes {} inputs, got {}", op, arity, wires.len()),
                        ));
                    }
                }
                self.module(line)?.add_gate(Gate::new(op, wires, output));
            }

            ".subckt" => {
                let (callee, bindings) = match args.split_first() {
                    Some(split) => split,
                    None => return Err(NetlistError::parse(line, ".subckt needs a model name")),
                };
                let mut pins = HashSet::new();
                let mut pairings: Vec<(WireId, WireId)> = vec![];
                for token in bindings {
                    let (pin, wire) = split_binding(token, line)?;
                    if !pins.insert(pin) {
                        return Err(NetlistError::parse(line, format!("pin '{}' bound twice", pin)));
                    }
                    let callee_wire = self.graph.allocator.id_for(pin)?;
                    let caller_wire = self.graph.allocator.id_for(wire)?;
                    pairings.push((caller_wire, callee_wire));
                }
                let instance = SubcircuitInstance::new(callee.as_str(), pairings);
                self.module(line)?.add_instance(instance);
            }

            ".names" | ".conn" => match args {
                [from, to] => {
                    let from = self.graph.allocator.id_for(from)?;
                    let to = self.graph.allocator.id_for(to)?;
                    self.module(line)?.add_gate(Gate::buf(from, to));
                    if record.keyword() == ".names" {
                        self.expect_cover = Some("1 1");
                    }
                }
                // Yosys declares its constant nets this way; they need no gate.
                [name] if record.keyword() == ".names" && is_constant_net(name) => {
                    self.module(line)?;
                    if name == TRUE_NAME {
                        self.expect_cover = Some("1");
                    }
                }
                _ => {
                    return Err(NetlistError::parse(
                        line,
                        format!("{} is only supported as a two-wire buffer", record.keyword()),
                    ))
                }
            },

            ".end" => match self.current.take() {
                Some(module) => {
                    self.graph.insert(module);
                }
                None => return Err(NetlistError::parse(line, ".end without .model")),
            },

            keyword => {
                return Err(NetlistError::parse(line, format!("unknown keyword '{}'", keyword)));
            }
        }
        Ok(())
    }

    fn module(&mut self, line: usize) -> NetlistResult<&mut Module> {
        self.current
            .as_mut()
            .ok_or_else(|| NetlistError::parse(line, "record outside of a .model"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::producers::examples::*;

    fn parse(text: &str) -> NetlistResult<ModuleGraph> {
        parse_blif(text, Domain::Boolean, &ParseOptions::default())
    }

    fn parse_error_line(text: &str) -> usize {
        match parse(text) {
            Err(NetlistError::ParseError { line, .. }) => line,
            other => panic!("expected a parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_records() {
        let recs = records("# header\n.inputs a \\\n  b # trailing\n\n.end\n");
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].line, 2);
        assert_eq!(recs[0].tokens, vec![".inputs", "a", "b"]);
        assert_eq!(recs[1].line, 5);
    }

    #[test]
    fn test_bus_order() {
        let bus = Regex::new(BUS_REGEX).unwrap();
        assert_eq!(
            bus_order(&bus, &["x[0]", "x[1]", "x[2]", "c", "y[0]", "y[1]"]),
            vec!["x[2]", "x[1]", "x[0]", "c", "y[1]", "y[0]"]
        );
        // Same prefix, different bus.
        assert_eq!(bus_order(&bus, &["ab[0]", "a[0]", "a[1]"]), vec!["ab[0]", "a[1]", "a[0]"]);
    }

    #[test]
    fn test_single_and() {
        let graph = parse(example_and_blif()).unwrap();
        let top = graph.top().unwrap();
        assert_eq!(top.name, "top");
        assert_eq!(top.inputs, vec![2, 3]);
        assert_eq!(top.outputs, vec![4]);
        assert_eq!(top.gates, vec![Gate::and(2, 3, 4)]);
    }

    #[test]
    fn test_bus_ports() {
        let text = ".model top\n.inputs a[0] a[1] b\n.outputs y\n.gate AND A=a[0] B=b Y=y\n.end\n";
        let graph = parse(text).unwrap();
        let alloc = &graph.allocator;
        let top = graph.top().unwrap();
        let names: Vec<_> = top.inputs.iter().map(|w| alloc.describe(*w)).collect();
        assert_eq!(names, vec!["a[1]", "a[0]", "b"]);
        assert_eq!(top.inputs, vec![2, 3, 4]);
    }

    #[test]
    fn test_names_and_conn() {
        let text = ".model top\n.inputs a\n.outputs y z\n.names $false\n.names $true\n1\n.names a y\n1 1\n.conn a z\n.end\n";
        let graph = parse(text).unwrap();
        let top = graph.top().unwrap();
        assert_eq!(top.gates, vec![Gate::buf(2, 3), Gate::buf(2, 4)]);
    }

    #[test]
    fn test_subcircuits_and_top_override() {
        let graph = parse(example_hierarchy_blif()).unwrap();
        assert_eq!(graph.len(), 2);
        let top = graph.top().unwrap();
        assert_eq!(top.instances.len(), 2);
        assert_eq!(top.instances[0].inputs.len(), 2);
        assert_eq!(top.instances[0].outputs.len(), 1);

        let options = ParseOptions {
            top: Some("and_inv".to_string()),
        };
        let graph = parse_blif(example_hierarchy_blif(), Domain::Boolean, &options).unwrap();
        assert_eq!(graph.top_name(), Some("and_inv"));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_error_line(".model a\n.model b\n"), 2);
        assert_eq!(parse_error_line(".inputs a\n"), 1);
        assert_eq!(parse_error_line(".model a\n.end\n.model a\n.end\n"), 3);
        assert_eq!(parse_error_line(".model a\n.latch x y\n.end\n"), 2);
        assert_eq!(parse_error_line(".model a\n.gate AND A=x Y=y\n.end\n"), 2);
        assert_eq!(parse_error_line(".model a\n.gate AND x y z\n.end\n"), 2);
        assert_eq!(parse_error_line(".model a\n.subckt b p=x p=y\n.end\n"), 2);
        assert_eq!(parse_error_line(".model a\n.names x y\n0 1\n.end\n"), 3);
        assert_eq!(parse_error_line(".end\n"), 1);
        assert_eq!(parse_error_line(".model a\n.inputs x\n"), 2);
    }

    #[test]
    fn test_arithmetic_constant_is_rejected() {
        let text = ".model top\n.outputs y\n.gate MUL A=$true B=x Y=y\n.end\n";
        match parse_blif(text, Domain::Arithmetic, &ParseOptions::default()) {
            Err(NetlistError::UnsupportedConstant { .. }) => {}
            other => panic!("expected UnsupportedConstant, got {:?}", other),
        }
    }
}
