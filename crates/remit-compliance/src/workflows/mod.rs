pub mod remittance;
