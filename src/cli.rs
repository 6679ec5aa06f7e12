//! Interface de linha de comando do leadflow baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (intake, update, next,
//! call, queue, show, metrics) e flags globais (--config, --verbose).

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use leadflow::pipeline::{
    LeadIntake, LeadSource, LeadStatus, StatusUpdateRequest, TransitionFields,
};

/// leadflow: ciclo de vida de leads de vendas e fila de ligações.
#[derive(Debug, Parser)]
#[command(name = "leadflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./leadflow.toml).
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Status aceito pela CLI, mapeado para [`LeadStatus`] internamente.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    New,
    Contacted,
    Qualified,
    Opportunity,
    ClosedWon,
    ClosedLost,
}

impl From<StatusArg> for LeadStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::New => LeadStatus::New,
            StatusArg::Contacted => LeadStatus::Contacted,
            StatusArg::Qualified => LeadStatus::Qualified,
            StatusArg::Opportunity => LeadStatus::Opportunity,
            StatusArg::ClosedWon => LeadStatus::ClosedWon,
            StatusArg::ClosedLost => LeadStatus::ClosedLost,
        }
    }
}

/// Origem do lead aceita pela CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceArg {
    Website,
    Referral,
    ColdCall,
    Social,
    Other,
}

impl From<SourceArg> for LeadSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Website => LeadSource::Website,
            SourceArg::Referral => LeadSource::Referral,
            SourceArg::ColdCall => LeadSource::ColdCall,
            SourceArg::Social => LeadSource::Social,
            SourceArg::Other => LeadSource::Other,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Cadastra um novo lead no status NEW.
    Intake(IntakeArgs),

    /// Solicita uma mudança de status para um lead.
    Update(UpdateArgs),

    /// Mostra o próximo lead que o agente deve ligar.
    Next {
        /// Identificador do agente.
        agent_id: String,
    },

    /// Registra o resultado de uma ligação e agenda a próxima tentativa.
    Call {
        lead_id: String,

        /// Resultado da ligação (ex.: "no answer", "voicemail").
        outcome: String,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Mostra a situação da fila de um agente.
    Queue {
        agent_id: String,

        /// Lista os leads abertos em ordem de prioridade.
        #[arg(long, default_value_t = false)]
        ranked: bool,
    },

    /// Mostra um lead.
    Show { lead_id: String },

    /// Mostra taxa de conversão, taxa de vitória e ticket médio.
    Metrics {
        /// Inclui os números de um agente específico.
        #[arg(long)]
        agent: Option<String>,

        /// Considera apenas os últimos N dias.
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        days: Option<u32>,
    },
}

impl Command {
    /// Descrição curta exibida no spinner.
    pub fn describe(&self) -> String {
        match self {
            Command::Intake(args) => format!("Creating lead {}", args.name),
            Command::Update(args) => format!("Updating lead {}", args.lead_id),
            Command::Next { agent_id } => format!("Finding next lead for {agent_id}"),
            Command::Call { lead_id, .. } => format!("Recording call for {lead_id}"),
            Command::Queue { agent_id, .. } => format!("Loading queue for {agent_id}"),
            Command::Show { lead_id } => format!("Loading lead {lead_id}"),
            Command::Metrics { agent: Some(agent), .. } => format!("Computing metrics for {agent}"),
            Command::Metrics { agent: None, .. } => "Computing metrics".to_string(),
        }
    }
}

#[derive(Debug, Args)]
pub struct IntakeArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub phone: Option<String>,

    #[arg(long)]
    pub company: Option<String>,

    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Valor estimado do negócio.
    #[arg(long)]
    pub value: Option<f64>,

    /// Nível de interesse de 1 a 5.
    #[arg(long)]
    pub interest: Option<u8>,

    /// Agente responsável pelo lead.
    #[arg(long)]
    pub agent: Option<String>,
}

impl From<IntakeArgs> for LeadIntake {
    fn from(args: IntakeArgs) -> Self {
        LeadIntake {
            name: args.name,
            email: args.email,
            phone: args.phone,
            company: args.company,
            source: args.source.map(LeadSource::from),
            estimated_value: args.value,
            interest_level: args.interest,
            assigned_agent_id: args.agent,
        }
    }
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    pub lead_id: String,

    /// Status de destino.
    #[arg(long, value_enum)]
    pub status: StatusArg,

    /// Status atual esperado; a atualização falha se o lead estiver em outro.
    #[arg(long, value_enum)]
    pub expect: Option<StatusArg>,

    /// Valor da venda (obrigatório para closed-won).
    #[arg(long)]
    pub sale_amount: Option<f64>,

    /// Produtos vendidos; pode ser repetido.
    #[arg(long = "product")]
    pub products: Vec<String>,

    /// Data do próximo contato em RFC 3339.
    #[arg(long)]
    pub follow_up: Option<DateTime<Utc>>,

    /// Motivo da perda (obrigatório para closed-lost).
    #[arg(long)]
    pub loss_reason: Option<String>,

    #[arg(long)]
    pub loss_details: Option<String>,

    #[arg(long)]
    pub call_outcome: Option<String>,

    #[arg(long)]
    pub call_notes: Option<String>,
}

impl UpdateArgs {
    pub fn request(&self) -> StatusUpdateRequest {
        let fields = TransitionFields {
            sale_amount: self.sale_amount,
            products: (!self.products.is_empty()).then(|| self.products.clone()),
            follow_up_date: self.follow_up,
            loss_reason: self.loss_reason.clone(),
            loss_details: self.loss_details.clone(),
            call_outcome: self.call_outcome.clone(),
            call_notes: self.call_notes.clone(),
        };
        let request = StatusUpdateRequest::to(self.status.into()).with_fields(fields);
        match self.expect {
            Some(current) => request.expecting(current.into()),
            None => request,
        }
    }
}
