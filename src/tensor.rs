use onnx_protobuf::tensor_proto::DataType;
use onnx_protobuf::{type_proto, TypeProto, ValueInfoProto};
use protobuf::{Enum, MessageField};

/// Element type code carried by every tensor that crosses the cut.
pub const TRANSFER_ELEMENT_TYPE: DataType = DataType::FLOAT;

#[derive(Clone, Debug, PartialEq)]
pub struct TensorMetadata {
    pub name: String,
    pub data_type: Option<DataType>,
}

impl TensorMetadata {
    pub fn new(name: impl Into<String>, data_type: Option<DataType>) -> Self {
        TensorMetadata {
            name: name.into(),
            data_type,
        }
    }

    pub fn from_value_info(value: &ValueInfoProto) -> Self {
        let data_type = value
            .type_
            .as_ref()
            .and_then(|ty| match &ty.value {
                Some(type_proto::Value::TensorType(tensor)) => DataType::from_i32(tensor.elem_type),
                _ => None,
            })
            .filter(|dt| *dt != DataType::UNDEFINED);
        TensorMetadata::new(value.name.clone(), data_type)
    }

    /// Graph-level declaration with element type only; the shape field is left
    /// unset, which ONNX reads as unknown rank.
    pub fn to_value_info(&self) -> ValueInfoProto {
        let mut tensor_type = type_proto::Tensor::new();
        tensor_type.elem_type = self.data_type.unwrap_or(DataType::UNDEFINED).value();

        let mut type_proto = TypeProto::new();
        type_proto.set_tensor_type(tensor_type);

        let mut value = ValueInfoProto::new();
        value.name = self.name.clone();
        value.type_ = MessageField::some(type_proto);
        value
    }
}

pub fn unknown_shape(name: impl Into<String>, data_type: DataType) -> ValueInfoProto {
    TensorMetadata::new(name, Some(data_type)).to_value_info()
}
