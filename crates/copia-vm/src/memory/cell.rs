// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Cells: the tagged, reference-counted objects of cons space.
//!
//! Every cell carries a tag, a reference count, a reserved access-control
//! pointer, and a payload whose shape is selected by the tag. The legacy
//! four-byte ASCII tag names survive as [`Tag::name`], which is what the
//! `type` primitive and memory dumps show; in memory the tag is simply the
//! payload discriminant.

use core::fmt;
use core::hash::Hasher;

use rustc_hash::FxHasher;

use crate::io::{SinkStream, SourceStream};
use crate::memory::conspage::Heap;
use crate::memory::vectorspace::VecTag;
use crate::types::CellPtr;
use crate::vm::Vm;

/// The maximum possible value of a reference count; a sentinel meaning
/// "pinned - never decrement, never free". NIL and T use it.
pub const MAX_REFERENCE: u32 = u32::MAX;

/// The host signature shared by all built-in functions and special forms:
/// the machine, a pointer to the invocation's stack frame, and the
/// evaluation environment.
pub type Executable = fn(&mut Vm, CellPtr, CellPtr) -> CellPtr;

/// Cell tags.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tag {
    /// The special cell at `(0, 0)`.
    Nil,
    /// The special cell at `(0, 1)`, canonically different from NIL.
    True,
    /// An unallocated cell on the freelist; never seen by Lisp code.
    Free,
    /// An ordinary cons cell.
    Cons,
    /// One character of a string, chained through the cdr.
    String,
    /// Like a string, but not self-evaluating and eligible for interning.
    Symbol,
    /// Like a symbol, but self-evaluating.
    Keyword,
    /// One limb of an arbitrary-precision integer chain.
    Integer,
    /// A rational number: two pointers to integers.
    Ratio,
    /// A real number.
    Real,
    /// An interpretable function.
    Lambda,
    /// An interpretable special form; to lambda as special is to function.
    NLambda,
    /// A built-in function whose arguments arrive evaluated in a frame.
    Function,
    /// A built-in special form whose arguments arrive unevaluated.
    Special,
    /// An open read stream.
    Read,
    /// An open write stream.
    Write,
    /// An exception, carrying a message and the throwing frame.
    Exception,
    /// A pointer to an object in vector space.
    VecPointer,
}

impl Tag {
    /// The legacy four-byte tag string, as seen in memory dumps.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Nil => "NIL ",
            Self::True => "TRUE",
            Self::Free => "FREE",
            Self::Cons => "CONS",
            Self::String => "STRG",
            Self::Symbol => "SYMB",
            Self::Keyword => "KEYW",
            Self::Integer => "INTR",
            Self::Ratio => "RTIO",
            Self::Real => "REAL",
            Self::Lambda => "LMDA",
            Self::NLambda => "NLMD",
            Self::Function => "FUNC",
            Self::Special => "SPFM",
            Self::Read => "READ",
            Self::Write => "WRIT",
            Self::Exception => "EXEP",
            Self::VecPointer => "VECP",
        }
    }
}

/// A cell's payload; the variant is the cell's tag.
pub enum Payload {
    /// NIL payload (singleton).
    Nil,
    /// T payload (singleton).
    True,
    /// Freelist link.
    Free {
        /// The next free cell, or NIL at the end of the freelist.
        next: CellPtr,
    },
    /// An ordinary cons cell.
    Cons {
        /// First of the pair.
        car: CellPtr,
        /// Rest of the pair.
        cdr: CellPtr,
    },
    /// One character of a string.
    String {
        /// The character stored in this cell; `'\0'` marks end of string.
        ch: char,
        /// Hash of the character chain starting here.
        hash: u32,
        /// The rest of the chain, or NIL.
        cdr: CellPtr,
    },
    /// One character of a symbol.
    Symbol {
        /// The character stored in this cell.
        ch: char,
        /// Hash of the character chain starting here.
        hash: u32,
        /// The rest of the chain, or NIL.
        cdr: CellPtr,
    },
    /// One character of a keyword.
    Keyword {
        /// The character stored in this cell.
        ch: char,
        /// Hash of the character chain starting here.
        hash: u32,
        /// The rest of the chain, or NIL.
        cdr: CellPtr,
    },
    /// One limb of an integer chain, least significant first.
    Integer {
        /// The limb value; the sign of the whole number rides on the least
        /// significant non-zero limb.
        value: i64,
        /// The next more significant limb, or NIL.
        more: CellPtr,
    },
    /// A ratio of two integers.
    Ratio {
        /// The dividend (numerator); an integer.
        dividend: CellPtr,
        /// The divisor (denominator); an integer, never zero.
        divisor: CellPtr,
    },
    /// A real number.
    Real {
        /// The value.
        value: f64,
    },
    /// An interpretable function.
    Lambda {
        /// The formal parameter list, or a single symbol for varargs.
        args: CellPtr,
        /// The body forms.
        body: CellPtr,
    },
    /// An interpretable special form.
    NLambda {
        /// The formal parameter list, or a single symbol for varargs.
        args: CellPtr,
        /// The body forms.
        body: CellPtr,
    },
    /// A built-in function.
    Function {
        /// Metadata (conventionally the primitive's name as a string).
        meta: CellPtr,
        /// The host implementation.
        executable: Executable,
    },
    /// A built-in special form.
    Special {
        /// Metadata (conventionally the primitive's name as a string).
        meta: CellPtr,
        /// The host implementation.
        executable: Executable,
    },
    /// An open read stream.
    Read {
        /// The backing character source.
        stream: Box<dyn SourceStream>,
        /// Metadata (a hashmap carrying at least `:path` or `:url`).
        meta: CellPtr,
    },
    /// An open write stream.
    Write {
        /// The backing character sink.
        sink: Box<dyn SinkStream>,
        /// Metadata.
        meta: CellPtr,
    },
    /// An exception.
    Exception {
        /// The message; usually a string, sometimes a cons of a string and
        /// the offending value.
        message: CellPtr,
        /// The frame at which the exception was thrown.
        frame: CellPtr,
    },
    /// A pointer into vector space.
    VecPointer {
        /// The vector-space tag, cached here so typechecks on the cell
        /// alone suffice.
        tag: VecTag,
        /// The slot address in vector space.
        address: usize,
    },
}

impl Payload {
    /// The tag selected by this payload.
    #[must_use]
    pub const fn tag(&self) -> Tag {
        match self {
            Self::Nil => Tag::Nil,
            Self::True => Tag::True,
            Self::Free { .. } => Tag::Free,
            Self::Cons { .. } => Tag::Cons,
            Self::String { .. } => Tag::String,
            Self::Symbol { .. } => Tag::Symbol,
            Self::Keyword { .. } => Tag::Keyword,
            Self::Integer { .. } => Tag::Integer,
            Self::Ratio { .. } => Tag::Ratio,
            Self::Real { .. } => Tag::Real,
            Self::Lambda { .. } => Tag::Lambda,
            Self::NLambda { .. } => Tag::NLambda,
            Self::Function { .. } => Tag::Function,
            Self::Special { .. } => Tag::Special,
            Self::Read { .. } => Tag::Read,
            Self::Write { .. } => Tag::Write,
            Self::Exception { .. } => Tag::Exception,
            Self::VecPointer { .. } => Tag::VecPointer,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cons { car, cdr } => write!(f, "Cons({car}, {cdr})"),
            Self::String { ch, .. } => write!(f, "String({ch:?})"),
            Self::Symbol { ch, .. } => write!(f, "Symbol({ch:?})"),
            Self::Keyword { ch, .. } => write!(f, "Keyword({ch:?})"),
            Self::Integer { value, more } => write!(f, "Integer({value}, {more})"),
            Self::Real { value } => write!(f, "Real({value})"),
            Self::VecPointer { tag, address } => write!(f, "VecPointer({}, {address})", tag.name()),
            other => f.write_str(other.tag().name()),
        }
    }
}

/// An object in cons space.
#[derive(Debug)]
pub struct Cell {
    /// The count of references to this cell.
    pub count: u32,
    /// Reserved access-control pointer; always NIL in the core.
    pub access: CellPtr,
    /// The tag-selected payload.
    pub payload: Payload,
}

/// Combine one character with the hash of the rest of a chain.
///
/// The terminator (`'\0'` cell or NIL) hashes to zero, so a string with and
/// without an explicit terminator cell hash identically, matching `equal`.
fn chain_hash(ch: char, tail_hash: u32) -> u32 {
    if ch == '\0' {
        return 0;
    }
    let mut hasher = FxHasher::default();
    hasher.write_u32(tail_hash);
    hasher.write_u32(ch as u32);
    // Truncation is fine: the cell stores a 32-bit hash.
    hasher.finish() as u32
}

/// Constructors.
///
/// All constructors return a cell with reference count zero; the caller is
/// responsible for the first increment if it retains the cell beyond the
/// statement. Structural constructors increment the counts of their child
/// pointers. On cons-space exhaustion every constructor returns the
/// pre-built, pinned out-of-memory exception instead.
impl Heap {
    /// Construct a cons cell from `car` and `cdr`.
    pub fn cons(&mut self, car: CellPtr, cdr: CellPtr) -> CellPtr {
        self.inc_ref(car);
        self.inc_ref(cdr);
        self.allocate(Payload::Cons { car, cdr })
    }

    /// Construct a string cell from this character and this tail.
    ///
    /// A string is a flat chain of cells each holding one character; the
    /// last cell's cdr is NIL, or a cell holding the sentinel `'\0'`.
    pub fn make_string(&mut self, ch: char, tail: CellPtr) -> CellPtr {
        let hash = chain_hash(ch, self.chain_hash_of(tail));
        self.inc_ref(tail);
        self.allocate(Payload::String {
            ch,
            hash,
            cdr: tail,
        })
    }

    /// Construct a symbol cell; identical to a string except for the tag.
    pub fn make_symbol(&mut self, ch: char, tail: CellPtr) -> CellPtr {
        let hash = chain_hash(ch, self.chain_hash_of(tail));
        self.inc_ref(tail);
        self.allocate(Payload::Symbol {
            ch,
            hash,
            cdr: tail,
        })
    }

    /// Construct a keyword cell; identical to a symbol except for the tag.
    pub fn make_keyword(&mut self, ch: char, tail: CellPtr) -> CellPtr {
        let hash = chain_hash(ch, self.chain_hash_of(tail));
        self.inc_ref(tail);
        self.allocate(Payload::Keyword {
            ch,
            hash,
            cdr: tail,
        })
    }

    /// Construct a string-like cell with the given tag.
    pub fn make_string_like(&mut self, ch: char, tail: CellPtr, tag: Tag) -> CellPtr {
        match tag {
            Tag::Symbol => self.make_symbol(ch, tail),
            Tag::Keyword => self.make_keyword(ch, tail),
            _ => self.make_string(ch, tail),
        }
    }

    /// Construct an interpretable function from formals and body.
    pub fn make_lambda(&mut self, args: CellPtr, body: CellPtr) -> CellPtr {
        self.inc_ref(args);
        self.inc_ref(body);
        self.allocate(Payload::Lambda { args, body })
    }

    /// Construct an interpretable special form from formals and body.
    pub fn make_nlambda(&mut self, args: CellPtr, body: CellPtr) -> CellPtr {
        self.inc_ref(args);
        self.inc_ref(body);
        self.allocate(Payload::NLambda { args, body })
    }

    /// Construct a cell which points to an executable built-in function.
    pub fn make_function(&mut self, meta: CellPtr, executable: Executable) -> CellPtr {
        self.inc_ref(meta);
        self.allocate(Payload::Function { meta, executable })
    }

    /// Construct a cell which points to an executable special form.
    pub fn make_special(&mut self, meta: CellPtr, executable: Executable) -> CellPtr {
        self.inc_ref(meta);
        self.allocate(Payload::Special { meta, executable })
    }

    /// Construct an exception from a message and the throwing frame.
    pub fn make_exception(&mut self, message: CellPtr, frame: CellPtr) -> CellPtr {
        self.inc_ref(message);
        self.inc_ref(frame);
        self.allocate(Payload::Exception { message, frame })
    }

    /// Construct a cell which wraps a stream open for reading.
    pub fn make_read_stream(&mut self, stream: Box<dyn SourceStream>, meta: CellPtr) -> CellPtr {
        self.inc_ref(meta);
        self.allocate(Payload::Read { stream, meta })
    }

    /// Construct a cell which wraps a stream open for writing.
    pub fn make_write_stream(&mut self, sink: Box<dyn SinkStream>, meta: CellPtr) -> CellPtr {
        self.inc_ref(meta);
        self.allocate(Payload::Write { sink, meta })
    }

    /// Return a Lisp string representing this host string.
    pub fn string_from_str(&mut self, s: &str) -> CellPtr {
        if s.is_empty() {
            // A cell holding the sentinel character makes the empty string
            // representable; a bare NIL would not read back.
            return self.make_string('\0', CellPtr::NIL);
        }
        let mut tail = CellPtr::NIL;
        for ch in s.chars().rev() {
            tail = self.make_string(ch, tail);
        }
        tail
    }

    /// Return a Lisp symbol representing this host string.
    pub fn symbol_from_str(&mut self, s: &str) -> CellPtr {
        let mut tail = CellPtr::NIL;
        for ch in s.chars().rev() {
            tail = self.make_symbol(ch, tail);
        }
        tail
    }

    /// Return a Lisp keyword representing this host string.
    pub fn keyword_from_str(&mut self, s: &str) -> CellPtr {
        let mut tail = CellPtr::NIL;
        for ch in s.chars().rev() {
            tail = self.make_keyword(ch, tail);
        }
        tail
    }

    /// Extract the host string from a string-like chain.
    #[must_use]
    pub fn string_to_host(&self, mut p: CellPtr) -> String {
        let mut result = String::new();
        while let Some((ch, _, cdr)) = self.string_parts(p) {
            if ch != '\0' {
                result.push(ch);
            }
            p = cdr;
        }
        result
    }
}

/// Accessors and predicates.
///
/// Accessors copy small data out of the cell so callers never hold a borrow
/// across an allocation.
impl Heap {
    /// The tag of the cell at this pointer.
    #[must_use]
    pub fn tag(&self, p: CellPtr) -> Tag {
        self.cell(p).payload.tag()
    }

    /// Check that the tag on the cell at this pointer is this tag.
    #[must_use]
    pub fn check_tag(&self, p: CellPtr, tag: Tag) -> bool {
        self.tag(p) == tag
    }

    /// The car of a cons cell; NIL for anything else.
    #[must_use]
    pub fn car(&self, p: CellPtr) -> CellPtr {
        match self.cell(p).payload {
            Payload::Cons { car, .. } => car,
            _ => CellPtr::NIL,
        }
    }

    /// The cdr of a cons cell or string-like chain; NIL for anything else.
    #[must_use]
    pub fn cdr(&self, p: CellPtr) -> CellPtr {
        match self.cell(p).payload {
            Payload::Cons { cdr, .. }
            | Payload::String { cdr, .. }
            | Payload::Symbol { cdr, .. }
            | Payload::Keyword { cdr, .. } => cdr,
            _ => CellPtr::NIL,
        }
    }

    /// The character, hash and cdr of a string-like cell.
    #[must_use]
    pub fn string_parts(&self, p: CellPtr) -> Option<(char, u32, CellPtr)> {
        match self.cell(p).payload {
            Payload::String { ch, hash, cdr }
            | Payload::Symbol { ch, hash, cdr }
            | Payload::Keyword { ch, hash, cdr } => Some((ch, hash, cdr)),
            _ => None,
        }
    }

    /// The chain hash stored on a string-like cell; zero for terminators.
    #[must_use]
    pub fn chain_hash_of(&self, p: CellPtr) -> u32 {
        self.string_parts(p).map_or(0, |(_, hash, _)| hash)
    }

    /// The value and more-pointer of an integer cell.
    #[must_use]
    pub fn integer_parts(&self, p: CellPtr) -> Option<(i64, CellPtr)> {
        match self.cell(p).payload {
            Payload::Integer { value, more } => Some((value, more)),
            _ => None,
        }
    }

    /// The dividend and divisor of a ratio cell.
    #[must_use]
    pub fn ratio_parts(&self, p: CellPtr) -> Option<(CellPtr, CellPtr)> {
        match self.cell(p).payload {
            Payload::Ratio { dividend, divisor } => Some((dividend, divisor)),
            _ => None,
        }
    }

    /// The value of a real cell.
    #[must_use]
    pub fn real_value(&self, p: CellPtr) -> Option<f64> {
        match self.cell(p).payload {
            Payload::Real { value } => Some(value),
            _ => None,
        }
    }

    /// The formals and body of a lambda or nlambda cell.
    #[must_use]
    pub fn lambda_parts(&self, p: CellPtr) -> Option<(CellPtr, CellPtr)> {
        match self.cell(p).payload {
            Payload::Lambda { args, body } | Payload::NLambda { args, body } => Some((args, body)),
            _ => None,
        }
    }

    /// The metadata and executable of a function or special-form cell.
    #[must_use]
    pub fn function_parts(&self, p: CellPtr) -> Option<(CellPtr, Executable)> {
        match self.cell(p).payload {
            Payload::Function { meta, executable } | Payload::Special { meta, executable } => {
                Some((meta, executable))
            }
            _ => None,
        }
    }

    /// The message and frame of an exception cell.
    #[must_use]
    pub fn exception_parts(&self, p: CellPtr) -> Option<(CellPtr, CellPtr)> {
        match self.cell(p).payload {
            Payload::Exception { message, frame } => Some((message, frame)),
            _ => None,
        }
    }

    /// The metadata of a stream cell.
    #[must_use]
    pub fn stream_meta(&self, p: CellPtr) -> Option<CellPtr> {
        match self.cell(p).payload {
            Payload::Read { meta, .. } | Payload::Write { meta, .. } => Some(meta),
            _ => None,
        }
    }

    /// The vector-space tag and address of a `VECP` cell.
    #[must_use]
    pub fn vecp_parts(&self, p: CellPtr) -> Option<(VecTag, usize)> {
        match self.cell(p).payload {
            Payload::VecPointer { tag, address } => Some((tag, address)),
            _ => None,
        }
    }

    /// True if the pointer indicates a cons cell.
    #[must_use]
    pub fn consp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Cons)
    }

    /// True if the pointer indicates a string cell.
    #[must_use]
    pub fn stringp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::String)
    }

    /// True if the pointer indicates a symbol cell.
    #[must_use]
    pub fn symbolp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Symbol)
    }

    /// True if the pointer indicates a keyword cell.
    #[must_use]
    pub fn keywordp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Keyword)
    }

    /// True if the pointer indicates an integer cell.
    #[must_use]
    pub fn integerp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Integer)
    }

    /// True if the pointer indicates a ratio cell.
    #[must_use]
    pub fn ratiop(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Ratio)
    }

    /// True if the pointer indicates a real cell.
    #[must_use]
    pub fn realp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Real)
    }

    /// True if the pointer indicates some sort of number cell.
    #[must_use]
    pub fn numberp(&self, p: CellPtr) -> bool {
        matches!(self.tag(p), Tag::Integer | Tag::Ratio | Tag::Real)
    }

    /// True if the pointer indicates something which can be treated as a
    /// sequence.
    #[must_use]
    pub fn sequencep(&self, p: CellPtr) -> bool {
        matches!(
            self.tag(p),
            Tag::Cons | Tag::String | Tag::Symbol | Tag::Keyword
        )
    }

    /// True if the pointer indicates an exception cell.
    #[must_use]
    pub fn exceptionp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Exception)
    }

    /// True if the pointer indicates a lambda cell.
    #[must_use]
    pub fn lambdap(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Lambda)
    }

    /// True if the pointer indicates an nlambda cell.
    #[must_use]
    pub fn nlambdap(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::NLambda)
    }

    /// True if the pointer indicates a built-in function cell.
    #[must_use]
    pub fn functionp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Function)
    }

    /// True if the pointer indicates a special-form cell.
    #[must_use]
    pub fn specialp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Special)
    }

    /// True if the pointer indicates a read-stream cell.
    #[must_use]
    pub fn readp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Read)
    }

    /// True if the pointer indicates a write-stream cell.
    #[must_use]
    pub fn writep(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::Write)
    }

    /// True if the pointer indicates a vector-space pointer cell.
    #[must_use]
    pub fn vectorpointp(&self, p: CellPtr) -> bool {
        self.check_tag(p, Tag::VecPointer)
    }

    /// True if the pointer indicates a hashmap in vector space.
    #[must_use]
    pub fn hashmapp(&self, p: CellPtr) -> bool {
        matches!(self.vecp_parts(p), Some((VecTag::Hash, _)))
    }

    /// True if the pointer indicates a stack frame in vector space.
    #[must_use]
    pub fn framep(&self, p: CellPtr) -> bool {
        matches!(self.vecp_parts(p), Some((VecTag::Frame, _)))
    }

    /// True if the pointer indicates the end of a string: NIL, or a
    /// string-like cell holding the sentinel character.
    #[must_use]
    pub fn end_of_stringp(&self, p: CellPtr) -> bool {
        p.is_nil() || self.string_parts(p).is_some_and(|(ch, _, _)| ch == '\0')
    }
}
