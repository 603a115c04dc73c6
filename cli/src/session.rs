use std::fmt::Write as _;

use anyhow::{Context, bail};
use tagvm_core::{ApiError, Handle, NativeFn, State, StateConfig, TagEvent, TagId, Type};

const HELP: &str = "\
stack:   push nil | push num N | push str TEXT | pushvalue I | pop N | settop I
         insert I | remove I | gettop | checkstack N | stack
values:  type I | tag I | tonumber I | tostring I | coerce num|str I
         equal I J | lessthan I J | concat N
tables:  newtable | rawget I | rawset I | rawgeti I N | rawseti I N
         gettable I | settable I | next I | getn I
globals: getglobal NAME | setglobal NAME | globals | setglobals
refs:    ref lock|hold | getref H | unref H
tags:    newtype NAME none|table|userdata | type2tag NAME | settag I TAG
         settagmethod TAG EVENT | gettagmethod TAG EVENT
calls:   pushfn add|echo|first|fail [CAPTURED] | call NARGS [NRES] | pcall NARGS [NRES]
misc:    newuserdata SIZE | gc threshold [KB] | gc count | gc cycles | gc collect | help";

/// Adds every argument (and captured value) as a number.
fn native_add(state: &mut State) -> anyhow::Result<usize> {
    let n = state.get_top() as i32;
    let sum: f64 = (1..=n).map(|i| state.to_number(i)).sum();
    state.push_number(sum);
    Ok(1)
}

/// Returns its whole frame.
fn native_echo(state: &mut State) -> anyhow::Result<usize> {
    Ok(state.get_top())
}

fn native_first(state: &mut State) -> anyhow::Result<usize> {
    if state.get_top() == 0 {
        state.push_nil();
    } else {
        state.push_value(1);
    }
    Ok(1)
}

fn native_fail(state: &mut State) -> anyhow::Result<usize> {
    let message = match state.to_string(1) {
        Some(s) => s.to_str_lossy().into_owned(),
        None => "native failure".to_string(),
    };
    Err(state.raise(message).into())
}

fn builtin(name: &str) -> Option<NativeFn> {
    let f: NativeFn = match name {
        "add" => native_add,
        "echo" => native_echo,
        "first" => native_first,
        "fail" => native_fail,
        _ => return None,
    };
    Some(f)
}

/// A line-oriented driver over one [`State`].
///
/// Every command maps onto one embedding operation. Indices and handles are
/// checked before they reach the state, so bad input reports an error
/// instead of tripping a contract check.
pub struct Session {
    state: State,
}

impl Session {
    pub fn new(config: StateConfig) -> anyhow::Result<Self> {
        Ok(Self {
            state: State::new(config)?,
        })
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Runs one command line, returning the text it prints (if any).
    pub fn exec_line(&mut self, line: &str) -> anyhow::Result<Option<String>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (cmd, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let args: Vec<&str> = rest.split_whitespace().collect();

        let out = match cmd {
            "help" => Some(HELP.to_string()),
            "push" => {
                self.push(rest)?;
                None
            }
            "pushvalue" => {
                let i = self.live(arg(&args, 0)?)?;
                self.reserve(1)?;
                self.state.push_value(i);
                None
            }
            "pop" => {
                let n: usize = parse(arg(&args, 0)?)?;
                if n > self.state.get_top() {
                    bail!("cannot pop {n} values, the stack holds {}", self.state.get_top());
                }
                self.state.pop(n);
                None
            }
            "settop" => {
                let i: i32 = parse(arg(&args, 0)?)?;
                if i < 0 {
                    self.live(i)?;
                }
                self.state.set_top(i)?;
                None
            }
            "insert" => {
                let i = self.live(arg(&args, 0)?)?;
                self.state.insert(i);
                None
            }
            "remove" => {
                let i = self.live(arg(&args, 0)?)?;
                self.state.remove(i);
                None
            }
            "gettop" => Some(self.state.get_top().to_string()),
            "checkstack" => {
                self.state.check_stack(parse(arg(&args, 0)?)?)?;
                None
            }
            "stack" => Some(self.dump()),
            "type" => {
                let i: i32 = parse(arg(&args, 0)?)?;
                let ty = self.probe(i).and_then(|i| self.state.type_of(i));
                Some(State::type_name(ty).to_string())
            }
            "tag" => {
                let i: i32 = parse(arg(&args, 0)?)?;
                Some(match self.probe(i) {
                    Some(i) => self.state.tag_name(i).to_string(),
                    None => State::type_name(None).to_string(),
                })
            }
            "tonumber" => {
                let i = self.live(arg(&args, 0)?)?;
                Some(tagvm_core::val::format_number(self.state.to_number(i)))
            }
            "tostring" => {
                let i = self.live(arg(&args, 0)?)?;
                Some(match self.state.to_string(i) {
                    Some(s) => s.to_str_lossy().into_owned(),
                    None => "nil".to_string(),
                })
            }
            "coerce" => {
                let i = self.live(arg(&args, 1)?)?;
                let ok = match arg(&args, 0)? {
                    "num" => self.state.coerce_to_number(i),
                    "str" => self.state.coerce_to_string(i),
                    other => bail!("unknown coercion '{other}'"),
                };
                Some(ok.to_string())
            }
            "equal" | "lessthan" => {
                let a = self.live(arg(&args, 0)?)?;
                let b = self.live(arg(&args, 1)?)?;
                let result = if cmd == "equal" {
                    self.state.equal(a, b)
                } else {
                    self.state.less_than(a, b)
                };
                Some(result.to_string())
            }
            "concat" => {
                let n: usize = parse(arg(&args, 0)?)?;
                if n > self.state.get_top() {
                    bail!("cannot concat {n} values, the stack holds {}", self.state.get_top());
                }
                self.reserve(1)?;
                self.state.concat(n)?;
                None
            }
            "newtable" => {
                self.reserve(1)?;
                self.state.new_table();
                None
            }
            "newuserdata" => {
                let size: usize = parse(arg(&args, 0)?)?;
                self.reserve(1)?;
                self.state.new_userdata(size)?;
                None
            }
            "rawget" | "gettable" => {
                let i = self.live(arg(&args, 0)?)?;
                self.need(1)?;
                if cmd == "rawget" {
                    self.state.raw_get(i)?;
                } else {
                    self.state.get_table(i)?;
                }
                None
            }
            "rawset" | "settable" => {
                let i = self.live(arg(&args, 0)?)?;
                self.need(2)?;
                if cmd == "rawset" {
                    self.state.raw_set(i)?;
                } else {
                    self.state.set_table(i)?;
                }
                None
            }
            "rawgeti" => {
                let i = self.live(arg(&args, 0)?)?;
                let n: i64 = parse(arg(&args, 1)?)?;
                self.reserve(1)?;
                self.state.raw_get_indexed(i, n)?;
                None
            }
            "rawseti" => {
                let i = self.live(arg(&args, 0)?)?;
                let n: i64 = parse(arg(&args, 1)?)?;
                self.need(1)?;
                self.state.raw_set_indexed(i, n)?;
                None
            }
            "next" => {
                let i = self.live(arg(&args, 0)?)?;
                self.need(1)?;
                self.reserve(1)?;
                Some(self.state.next(i)?.to_string())
            }
            "getn" => {
                let i = self.live(arg(&args, 0)?)?;
                Some(self.state.length_hint(i)?.to_string())
            }
            "getglobal" => {
                self.reserve(1)?;
                self.state.get_global(arg(&args, 0)?);
                None
            }
            "setglobal" => {
                self.need(1)?;
                self.state.set_global(arg(&args, 0)?)?;
                None
            }
            "globals" => {
                self.reserve(1)?;
                self.state.push_globals();
                None
            }
            "setglobals" => {
                self.need(1)?;
                self.state.set_globals()?;
                None
            }
            "ref" => {
                let lock = match arg(&args, 0)? {
                    "lock" => true,
                    "hold" => false,
                    other => bail!("expected 'lock' or 'hold', got '{other}'"),
                };
                self.need(1)?;
                Some(self.state.create_ref(lock)?.raw().to_string())
            }
            "getref" => {
                let handle = self.handle(arg(&args, 0)?)?;
                self.reserve(1)?;
                self.state.get_ref(handle);
                None
            }
            "unref" => {
                let handle = self.handle(arg(&args, 0)?)?;
                self.state.release_ref(handle);
                None
            }
            "newtype" => {
                let basic = match arg(&args, 1).unwrap_or("none") {
                    "none" => None,
                    other => Some(Type::parse(other).with_context(|| format!("unknown type '{other}'"))?),
                };
                Some(self.state.new_tag(arg(&args, 0)?, basic)?.to_string())
            }
            "type2tag" => {
                let name = arg(&args, 0)?;
                let tag = self
                    .state
                    .lookup_tag(name)
                    .with_context(|| format!("no type named '{name}'"))?;
                Some(tag.to_string())
            }
            "settag" => {
                let i = self.live(arg(&args, 0)?)?;
                let tag = TagId(parse(arg(&args, 1)?)?);
                self.state.set_tag(i, tag)?;
                None
            }
            "settagmethod" | "gettagmethod" => {
                let tag = TagId(parse(arg(&args, 0)?)?);
                let event = arg(&args, 1)?;
                let event = TagEvent::parse(event).with_context(|| format!("unknown event '{event}'"))?;
                if cmd == "settagmethod" {
                    self.need(1)?;
                    self.state.set_tag_method(tag, event)?;
                } else {
                    self.reserve(1)?;
                    self.state.get_tag_method(tag, event)?;
                }
                None
            }
            "pushfn" => {
                let name = arg(&args, 0)?;
                let f = builtin(name).with_context(|| format!("unknown native '{name}'"))?;
                let captured: usize = args.get(1).map(|s| parse(s)).transpose()?.unwrap_or(0);
                self.need(captured)?;
                self.state.push_native_function(f, captured);
                None
            }
            "call" | "pcall" => {
                let nargs: usize = parse(arg(&args, 0)?)?;
                let nresults = match args.get(1) {
                    None | Some(&"all") => None,
                    Some(n) => Some(parse(n)?),
                };
                self.need(nargs + 1)?;
                if cmd == "call" {
                    self.state.call(nargs, nresults)?;
                } else {
                    self.state.pcall(nargs, nresults)?;
                }
                None
            }
            "gc" => self.gc(&args)?,
            other => bail!("unknown command '{other}' (try 'help')"),
        };
        Ok(out)
    }

    fn push(&mut self, rest: &str) -> anyhow::Result<()> {
        let (kind, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        self.reserve(1)?;
        match kind {
            "nil" => self.state.push_nil(),
            "num" => {
                let text = value.trim();
                let n = tagvm_core::val::parse_number(text.as_bytes())
                    .with_context(|| format!("'{text}' is not a number"))?;
                self.state.push_number(n);
            }
            "str" => self.state.push_string(value),
            other => bail!("cannot push '{other}', expected nil, num or str"),
        }
        Ok(())
    }

    fn gc(&mut self, args: &[&str]) -> anyhow::Result<Option<String>> {
        Ok(match arg(args, 0)? {
            "threshold" => match args.get(1) {
                Some(kb) => {
                    self.state.set_threshold(parse(kb)?);
                    None
                }
                None => Some(self.state.get_threshold().to_string()),
            },
            "count" => Some(self.state.get_live_estimate().to_string()),
            "cycles" => Some(self.state.gc_cycles().to_string()),
            "collect" => {
                self.state.collect_garbage();
                None
            }
            other => bail!("unknown gc command '{other}'"),
        })
    }

    /// Checks that `raw` names a live slot.
    fn live(&self, raw: impl IndexArg) -> anyhow::Result<i32> {
        let index = raw.index()?;
        let used = self.state.get_top();
        if index == 0 || index.unsigned_abs() as usize > used {
            return Err(ApiError::OutOfRangeIndex(index).into());
        }
        Ok(index)
    }

    /// Like [`Session::live`] but lets positive indices past the top through
    /// as absent values.
    fn probe(&self, index: i32) -> Option<i32> {
        let used = self.state.get_top();
        if index == 0 || (index < 0 && index.unsigned_abs() as usize > used) {
            return None;
        }
        (index < 0 || index as usize <= used).then_some(index)
    }

    fn handle(&self, raw: &str) -> anyhow::Result<Handle> {
        let handle = Handle::from_raw(parse(raw)?);
        if handle.raw() >= 0 && self.state.ref_anchor(handle).is_none() {
            return Err(ApiError::InvalidHandle(handle.raw()).into());
        }
        Ok(handle)
    }

    fn need(&self, n: usize) -> anyhow::Result<()> {
        let used = self.state.get_top();
        if used < n {
            bail!("operation needs {n} values, the stack holds {used}");
        }
        Ok(())
    }

    fn reserve(&mut self, n: usize) -> anyhow::Result<()> {
        if self.state.stack_space() < n {
            self.state.check_stack(n)?;
        }
        Ok(())
    }

    fn dump(&self) -> String {
        let mut out = String::new();
        let top = self.state.get_top() as i32;
        for i in 1..=top {
            if i > 1 {
                out.push('\n');
            }
            let ty = self.state.type_of(i);
            let _ = write!(out, "{i}: {}", State::type_name(ty));
            match ty {
                Some(Type::Number) | Some(Type::String) => {
                    if let Some(s) = self.state.to_string(i) {
                        let _ = write!(out, " {}", s.to_str_lossy());
                    }
                }
                Some(Type::Table) | Some(Type::UserData) => {
                    let tag = self.state.tag_name(i);
                    if Type::parse(tag).is_none() {
                        let _ = write!(out, " <{tag}>");
                    }
                }
                _ => {}
            }
        }
        if out.is_empty() {
            out.push_str("(empty)");
        }
        out
    }
}

trait IndexArg {
    fn index(self) -> anyhow::Result<i32>;
}

impl IndexArg for i32 {
    fn index(self) -> anyhow::Result<i32> {
        Ok(self)
    }
}

impl IndexArg for &str {
    fn index(self) -> anyhow::Result<i32> {
        parse(self)
    }
}

fn arg<'a>(args: &[&'a str], n: usize) -> anyhow::Result<&'a str> {
    args.get(n)
        .copied()
        .with_context(|| format!("missing argument #{}", n + 1))
}

fn parse<T>(raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse::<T>().with_context(|| format!("invalid argument '{raw}'"))
}
