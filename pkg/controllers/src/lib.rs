pub mod resourcequota;
