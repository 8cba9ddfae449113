//! Binary sheet persistence
//!
//! The wire format is a flat little-endian stream:
//!
//! ```text
//! SheetFile := CellCount:u64  Entry*CellCount
//! Entry     := Position Cell
//! Position  := Row:i32  Col:i32  Flags:u8      (bit0 abs_row, bit1 abs_col)
//! Cell      := NodeCount:u64  Node*NodeCount  InEval:u8
//! Node      := TypeId:i32  payload
//! ```
//!
//! Payloads: `Num` carries an f64, `Str` a u64 length plus UTF-8 bytes,
//! `Ref` a position; every other node is just its type id. The trailing
//! `InEval` byte is always written as 0 (no evaluation is in flight while
//! saving) and is ignored on load.

use crate::cell::Cell;
use crate::error::{Error, Result};
use crate::op::{CellMap, Op, Program};
use crate::position::Position;
use std::io::{Read, Write};

const FLAG_ABS_ROW: u8 = 0x01;
const FLAG_ABS_COL: u8 = 0x02;

// === Fixed-width primitives, little-endian ===

fn read_u8<R: Read>(r: &mut R) -> Result<u8> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_u64<R: Read>(r: &mut R) -> Result<u64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

fn read_f64<R: Read>(r: &mut R) -> Result<f64> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

fn write_u8<W: Write>(w: &mut W, v: u8) -> Result<()> {
    Ok(w.write_all(&[v])?)
}

fn write_i32<W: Write>(w: &mut W, v: i32) -> Result<()> {
    Ok(w.write_all(&v.to_le_bytes())?)
}

fn write_u64<W: Write>(w: &mut W, v: u64) -> Result<()> {
    Ok(w.write_all(&v.to_le_bytes())?)
}

fn write_f64<W: Write>(w: &mut W, v: f64) -> Result<()> {
    Ok(w.write_all(&v.to_le_bytes())?)
}

/// Length-prefixed UTF-8 string. The read is bounded by the stream, so a
/// corrupt length cannot force an oversized allocation up front.
fn read_string<R: Read>(r: &mut R) -> Result<String> {
    let len = read_u64(r)?;
    let mut bytes = Vec::new();
    r.take(len).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != len {
        return Err(Error::Corrupted(format!(
            "string payload truncated: expected {len} bytes, got {}",
            bytes.len()
        )));
    }
    String::from_utf8(bytes)
        .map_err(|_| Error::Corrupted("string payload is not valid UTF-8".into()))
}

fn write_string<W: Write>(w: &mut W, s: &str) -> Result<()> {
    write_u64(w, s.len() as u64)?;
    Ok(w.write_all(s.as_bytes())?)
}

// === Positions ===

fn read_position<R: Read>(r: &mut R) -> Result<Position> {
    let row = read_i32(r)?;
    let col = read_i32(r)?;
    let flags = read_u8(r)?;
    Ok(Position {
        row,
        col,
        abs_row: flags & FLAG_ABS_ROW != 0,
        abs_col: flags & FLAG_ABS_COL != 0,
    })
}

fn write_position<W: Write>(w: &mut W, pos: &Position) -> Result<()> {
    write_i32(w, pos.row)?;
    write_i32(w, pos.col)?;
    let mut flags = 0u8;
    if pos.abs_row {
        flags |= FLAG_ABS_ROW;
    }
    if pos.abs_col {
        flags |= FLAG_ABS_COL;
    }
    write_u8(w, flags)
}

// === Nodes ===

fn read_op<R: Read>(r: &mut R) -> Result<Op> {
    let id = read_i32(r)?;
    let node = Op::from_type_id(id).ok_or_else(|| {
        log::warn!("unknown operation type id {id} in sheet stream");
        Error::Corrupted(format!("unknown operation type id {id}"))
    })?;

    Ok(match node {
        Op::Ref(_) => Op::Ref(read_position(r)?),
        Op::Num(_) => Op::Num(read_f64(r)?),
        Op::Str(_) => Op::Str(read_string(r)?),
        other => other,
    })
}

fn write_op<W: Write>(w: &mut W, node: &Op) -> Result<()> {
    write_i32(w, node.type_id())?;
    match node {
        Op::Ref(pos) => write_position(w, pos),
        Op::Num(n) => write_f64(w, *n),
        Op::Str(s) => write_string(w, s),
        _ => Ok(()),
    }
}

// === Cells ===

fn read_cell<R: Read>(r: &mut R) -> Result<Cell> {
    let count = read_u64(r)?;
    // Trust the count only after the nodes actually arrive.
    let mut program = Program::with_capacity(count.min(64) as usize);
    for _ in 0..count {
        program.push(read_op(r)?);
    }
    let _in_eval = read_u8(r)?;
    Ok(Cell::with_program(program))
}

fn write_cell<W: Write>(w: &mut W, cell: &Cell) -> Result<()> {
    write_u64(w, cell.program().len() as u64)?;
    for node in cell.program() {
        write_op(w, node)?;
    }
    write_u8(w, 0)
}

// === Sheets ===

/// Read a complete cell map from `source`. The caller swaps it in only
/// when this returns `Ok`, which is what makes `load` atomic.
pub fn read_sheet<R: Read>(source: &mut R) -> Result<CellMap> {
    let count = read_u64(source)?;
    let mut cells = CellMap::new();
    for _ in 0..count {
        let pos = read_position(source)?;
        let cell = read_cell(source)?;
        cells.insert(pos, cell);
    }
    Ok(cells)
}

/// Write a complete cell map to `sink`.
pub fn write_sheet<W: Write>(sink: &mut W, cells: &CellMap) -> Result<()> {
    write_u64(sink, cells.len() as u64)?;
    for (pos, cell) in cells {
        write_position(sink, pos)?;
        write_cell(sink, cell)?;
    }
    Ok(())
}
