//! Target size and alignment computation (x86-64 SysV-style C layout).
//!
//! Feeds `sizeof`, the entry-block zero fills and aggregate copies.

use dmz_sema::{DeclKind, DeclId, ResolvedProgram, Ty};

pub const POINTER_SIZE: u64 = 8;

pub fn size_of(prog: &ResolvedProgram, ty: &Ty) -> u64 {
    size_and_align(prog, ty).0
}

pub fn align_of(prog: &ResolvedProgram, ty: &Ty) -> u64 {
    size_and_align(prog, ty).1
}

pub fn size_and_align(prog: &ResolvedProgram, ty: &Ty) -> (u64, u64) {
    match ty {
        Ty::Void => (0, 1),
        Ty::Bool => (1, 1),
        Ty::Number { bits, .. } => {
            let bytes = (*bits as u64 + 7) / 8;
            let align = bytes.next_power_of_two().min(8);
            (round_up(bytes, align), align)
        }
        Ty::Pointer(_) | Ty::Error | Ty::Function { .. } => (POINTER_SIZE, POINTER_SIZE),
        Ty::Slice(_) => (2 * POINTER_SIZE, POINTER_SIZE),
        Ty::Array { elem, len } => {
            let (size, align) = size_and_align(prog, elem);
            (round_up(size, align) * len, align)
        }
        Ty::Optional(inner) => {
            // `{ value-or-i1, error ptr }`.
            let (value_size, value_align) = if **inner == Ty::Void {
                (1, 1)
            } else {
                size_and_align(prog, inner)
            };
            let align = value_align.max(POINTER_SIZE);
            let error_offset = round_up(value_size, POINTER_SIZE);
            (round_up(error_offset + POINTER_SIZE, align), align)
        }
        Ty::Struct(id) => struct_size_and_align(prog, *id),
        Ty::Range | Ty::Module(_) | Ty::ErrorGroup(_) | Ty::Generic(_) | Ty::DefaultInit => {
            unreachable!("type {ty:?} has no runtime layout")
        }
    }
}

fn struct_size_and_align(prog: &ResolvedProgram, id: DeclId) -> (u64, u64) {
    let mut size = 0u64;
    let mut align = 1u64;

    for field in &prog.strukt(id).fields {
        let DeclKind::Field { ty, .. } = &prog.decl(*field).kind else {
            unreachable!()
        };
        let (field_size, field_align) = size_and_align(prog, ty);
        size = round_up(size, field_align) + field_size;
        align = align.max(field_align);
    }

    (round_up(size.max(1), align), align)
}

fn round_up(value: u64, align: u64) -> u64 {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_sizes() {
        let prog = ResolvedProgram::default();
        assert_eq!(size_of(&prog, &Ty::Bool), 1);
        assert_eq!(size_of(&prog, &Ty::I32), 4);
        assert_eq!(size_of(&prog, &Ty::ISIZE), 8);
        assert_eq!(size_of(&prog, &Ty::Error), 8);
        assert_eq!(size_of(&prog, &Ty::ptr_to(Ty::U8)), 8);
    }

    #[test]
    fn aggregate_sizes() {
        let prog = ResolvedProgram::default();
        assert_eq!(size_of(&prog, &Ty::Slice(Box::new(Ty::I32))), 16);
        assert_eq!(
            size_of(
                &prog,
                &Ty::Array {
                    elem: Box::new(Ty::I32),
                    len: 5
                }
            ),
            20
        );
        // { i32 value, pad, ptr error } -> 16 bytes.
        assert_eq!(size_of(&prog, &Ty::optional_of(Ty::I32)), 16);
        // { i1 value, pad, ptr error } -> 16 bytes.
        assert_eq!(size_of(&prog, &Ty::optional_of(Ty::Void)), 16);
    }

    #[test]
    fn odd_bit_widths_round_up() {
        let prog = ResolvedProgram::default();
        assert_eq!(
            size_of(
                &prog,
                &Ty::Number {
                    kind: dmz_sema::NumberKind::Signed,
                    bits: 1
                }
            ),
            1
        );
        assert_eq!(
            size_of(
                &prog,
                &Ty::Number {
                    kind: dmz_sema::NumberKind::Unsigned,
                    bits: 48
                }
            ),
            8
        );
    }
}
