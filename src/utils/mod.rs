pub mod eth_address_validator;
