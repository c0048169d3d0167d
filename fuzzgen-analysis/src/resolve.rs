//! Mapping of IR types onto [`TypeDump`]s.
//!
//! Resolution is pure: the same type and data layout always produce the
//! same dump. Pointer chains are stripped first and only their depth is
//! kept; the base type decides the rest.

use inkwell::targets::TargetData;
use inkwell::types::{AnyType, AnyTypeEnum, BasicType, BasicTypeEnum, StructType};

use crate::types::{BaseKind, StructBody, StructDump, TypeDump, TypeHeader};

pub struct TypeResolver {
    target_data: TargetData,
}

impl TypeResolver {
    pub fn new(target_data: TargetData) -> Self {
        Self { target_data }
    }

    /// Build a resolver from a data-layout string, as recorded in the
    /// module header.
    pub fn from_layout(layout: &str) -> Self {
        Self::new(TargetData::create(layout))
    }

    /// Resolve an arbitrary IR type.
    pub fn resolve(&self, ty: AnyTypeEnum) -> TypeDump {
        let mut base = ty;
        let mut pointer_depth: u8 = 0;

        // Dig through the pointer chain to the base type.
        while let AnyTypeEnum::PointerType(pointer) = base {
            pointer_depth = pointer_depth.saturating_add(1);
            base = pointer.get_element_type();
        }

        let mut dump = match base {
            AnyTypeEnum::VoidType(_) => {
                // Plain void is sizeless; a void pointer still allocates.
                let size = if pointer_depth > 0 { self.alloc_size(ty) } else { 0 };
                TypeDump::plain(BaseKind::Void, size)
            }
            AnyTypeEnum::IntType(int) => {
                let kind = match int.get_bit_width() {
                    1 | 8 => BaseKind::Int8,
                    16 => BaseKind::Int16,
                    32 => BaseKind::Int32,
                    64 => BaseKind::Int64,
                    _ => BaseKind::IntUnknown,
                };
                TypeDump::plain(kind, self.alloc_size(ty))
            }
            AnyTypeEnum::FloatType(float) => match self.target_data.get_bit_size(&float) {
                32 => TypeDump::plain(BaseKind::Float, self.alloc_size(ty)),
                64 => TypeDump::plain(BaseKind::Double, self.alloc_size(ty)),
                _ => TypeDump::plain(BaseKind::Unknown, 0),
            },
            AnyTypeEnum::StructType(strukt) => self.struct_reference(ty, strukt),
            AnyTypeEnum::FunctionType(_) => TypeDump::Func(TypeHeader::new(BaseKind::Func, 0)),
            AnyTypeEnum::ArrayType(_) => TypeDump::plain(BaseKind::Array, 0),
            _ => TypeDump::plain(BaseKind::Unknown, 0),
        };

        dump.header_mut().pointer_depth = pointer_depth;
        dump
    }

    pub fn resolve_basic(&self, ty: BasicTypeEnum) -> TypeDump {
        self.resolve(ty.as_any_type_enum())
    }

    /// Dump one struct definition. Used by the module-level sweep, which
    /// emits each named struct exactly once.
    pub fn resolve_struct_definition(&self, strukt: StructType) -> StructDump {
        let name = struct_name(strukt);

        if strukt.is_opaque() {
            // Nothing to discover; the body stays present but zero-filled.
            return StructDump {
                header: TypeHeader::new(BaseKind::Struct, 0),
                name,
                is_definition: true,
                body: Some(StructBody::default()),
            };
        }

        let size = self.target_data.get_abi_size(&strukt);
        let alignment = self.target_data.get_abi_alignment(&strukt) as u16;
        let field_count = strukt.count_fields();

        let mut fields = Vec::with_capacity(field_count as usize);
        for index in 0..field_count {
            let offset = self
                .target_data
                .offset_of_element(&strukt, index)
                .unwrap_or(0);
            if let Some(field_type) = strukt.get_field_type_at_index(index) {
                fields.push((offset, self.resolve_basic(field_type)));
            }
        }

        StructDump {
            header: TypeHeader::new(BaseKind::Struct, size),
            name,
            is_definition: true,
            body: Some(StructBody {
                field_count,
                size,
                alignment,
                fields,
            }),
        }
    }

    /// A struct reached while resolving a value type is dumped as a
    /// reference; the name is enough to find the definition later.
    fn struct_reference(&self, full_type: AnyTypeEnum, strukt: StructType) -> TypeDump {
        TypeDump::Struct(StructDump {
            header: TypeHeader::new(BaseKind::Struct, self.alloc_size(full_type)),
            name: struct_name(strukt),
            is_definition: false,
            body: None,
        })
    }

    fn alloc_size(&self, ty: AnyTypeEnum) -> u64 {
        match ty {
            AnyTypeEnum::VoidType(_) | AnyTypeEnum::FunctionType(_) => 0,
            AnyTypeEnum::StructType(strukt) if !strukt.is_sized() => 0,
            _ => self.target_data.get_abi_size(&ty),
        }
    }
}

fn struct_name(strukt: StructType) -> String {
    strukt
        .get_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
