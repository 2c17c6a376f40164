pub mod exchangerate_host;
