pub mod operator_dto;
pub mod public_dto;
