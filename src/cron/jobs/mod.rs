pub mod epoch_release;
