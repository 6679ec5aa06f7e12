//! Interface de terminal do leadflow: spinner e saída colorida.
//!
//! Usa `indicatif` para o spinner enquanto o comando roda e `console` para
//! o resumo colorido. O corpo do [`Envelope`] é impresso como JSON.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use leadflow::response::Envelope;

/// Indicador visual de um comando em execução no terminal.
pub struct CommandProgress {
    pb: ProgressBar,
    green: Style,
    red: Style,
    dim: Style,
}

impl CommandProgress {
    /// Inicia o spinner com a descrição do comando.
    pub fn start(description: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        pb.set_style(style);
        pb.set_message(description.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Finaliza o spinner e imprime o envelope.
    ///
    /// Sucesso em verde com checkmark; falha em vermelho com X e os códigos de erro.
    pub fn finish(&self, envelope: &Envelope) {
        self.pb.finish_and_clear();
        if envelope.success {
            println!("  {} {}", self.green.apply_to("✓"), envelope.message);
        } else {
            println!("  {} {}", self.red.apply_to("✗"), envelope.message);
            if let Some(codes) = &envelope.errors {
                println!("    {}", self.dim.apply_to(codes.join(", ")));
            }
        }

        if let Some(data) = &envelope.data {
            println!();
            println!("{}", serde_json::to_string_pretty(data).unwrap_or_default());
        }
    }
}
