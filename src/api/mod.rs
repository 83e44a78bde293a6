pub mod monzo;
